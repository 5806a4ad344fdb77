use crate::document::{self, TopologyDocument};
use crate::topology::Topology;
use color_eyre::eyre::{eyre, WrapErr};
use color_eyre::Result;
use log::info;
use std::fs;
use std::path::{Path, PathBuf};

/// Default file name of the persisted topology document
pub const DEFAULT_DOCUMENT_NAME: &str = "net_config.yml";

/// Load and parse a topology document from a YAML file
pub fn load_topology(path: &Path) -> Result<Topology> {
    info!("Loading topology from: {:?}", path);

    if !path.exists() {
        return Err(eyre!("Topology file not found: {}", path.display()));
    }

    let content = fs::read_to_string(path)
        .wrap_err_with(|| format!("Failed to read topology file '{}'", path.display()))?;

    let document = TopologyDocument::from_yaml_str(&content)
        .wrap_err_with(|| format!("Failed to parse topology file '{}'", path.display()))?;

    let topology = document::deserialize(&document)
        .wrap_err_with(|| format!("Invalid topology in '{}'", path.display()))?;

    info!(
        "Loaded topology with {} servers and {} clients",
        topology.server_count(),
        topology.client_count()
    );

    Ok(topology)
}

/// Serialize a topology and write it to a YAML file
pub fn save_topology(path: &Path, topology: &Topology) -> Result<()> {
    let content = document::serialize(topology).to_yaml_string()?;

    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .wrap_err_with(|| format!("Failed to create directory '{}'", parent.display()))?;
    }

    fs::write(path, content)
        .wrap_err_with(|| format!("Failed to write topology file '{}'", path.display()))?;

    info!("Wrote topology to: {:?}", path);
    Ok(())
}

/// Copy a topology document into each of the given directories, keeping
/// its file name. Returns the paths written.
pub fn distribute_document(path: &Path, directories: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let file_name = path
        .file_name()
        .ok_or_else(|| eyre!("Topology path '{}' has no file name", path.display()))?;

    let mut written = Vec::with_capacity(directories.len());
    for directory in directories {
        fs::create_dir_all(directory)
            .wrap_err_with(|| format!("Failed to create directory '{}'", directory.display()))?;

        let target = directory.join(file_name);
        fs::copy(path, &target).wrap_err_with(|| {
            format!("Failed to copy '{}' to '{}'", path.display(), target.display())
        })?;

        info!("Copied topology to: {:?}", target);
        written.push(target);
    }

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::generate;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(DEFAULT_DOCUMENT_NAME);
        let topology = generate(2, 4, &mut StdRng::seed_from_u64(5)).unwrap();

        save_topology(&path, &topology).unwrap();
        let loaded = load_topology(&path).unwrap();
        assert_eq!(loaded, topology);
    }

    #[test]
    fn test_load_original_layout() {
        let yaml = r#"
parameters:
  nb_servers: 1
  nb_clients: 1

server0:
  address: server0
  port_server: 12345
  port_client: 12346

client0:
  address_server: server0
  port_server: 12346
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "{}", yaml).unwrap();

        let topology = load_topology(temp_file.path()).unwrap();
        assert_eq!(topology.client_count(), 1);
        assert_eq!(topology.clients()[0].assigned_server, 0);
    }

    #[test]
    fn test_missing_file_error_names_the_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("absent.yml");
        let error = load_topology(&path).unwrap_err();
        assert!(error.to_string().contains("absent.yml"));
    }

    #[test]
    fn test_malformed_file_is_rejected() {
        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "parameters:\n  nb_servers: 1\n  nb_clients: 0\n").unwrap();
        assert!(load_topology(temp_file.path()).is_err());
    }

    #[test]
    fn test_distribute_document() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join(DEFAULT_DOCUMENT_NAME);
        save_topology(&source, &generate(1, 1, &mut StdRng::seed_from_u64(0)).unwrap()).unwrap();

        let targets = vec![dir.path().join("server"), dir.path().join("client")];
        let written = distribute_document(&source, &targets).unwrap();

        assert_eq!(written.len(), 2);
        for path in written {
            assert!(path.ends_with(DEFAULT_DOCUMENT_NAME));
            assert_eq!(load_topology(&path).unwrap(), load_topology(&source).unwrap());
        }
    }
}
