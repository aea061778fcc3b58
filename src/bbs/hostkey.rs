//! Host key management: load the key named in the configuration, or
//! generate one and persist it with owner-only permissions on first start.

use std::path::Path;

use anyhow::{Context, Result};
use log::info;
use russh::keys::key::KeyPair;
use russh::keys::{encode_pkcs8_pem, load_secret_key};

/// Load the host key at `path`, generating and persisting a fresh one (mode
/// 0600) when the file does not exist yet.
pub fn load_or_generate(path: &str) -> Result<KeyPair> {
    if Path::new(path).exists() {
        return load_secret_key(path, None)
            .with_context(|| format!("failed to parse host key {}", path));
    }

    let key = KeyPair::generate_ed25519();
    let mut pem = Vec::new();
    encode_pkcs8_pem(&key, &mut pem).context("failed to encode host key")?;
    std::fs::write(path, &pem)
        .with_context(|| format!("failed to write host key {}", path))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
            .with_context(|| format!("failed to set host key permissions on {}", path))?;
    }

    info!("Generated new host key at {}", path);
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use russh::keys::PublicKeyBase64;

    #[test]
    fn generates_then_reloads_same_key() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("host_key");
        let path_str = path.to_str().unwrap();

        let generated = load_or_generate(path_str).expect("generate");
        assert!(path.exists());

        let reloaded = load_or_generate(path_str).expect("reload");
        assert_eq!(
            generated.clone_public_key().unwrap().public_key_base64(),
            reloaded.clone_public_key().unwrap().public_key_base64()
        );
    }

    #[cfg(unix)]
    #[test]
    fn generated_key_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("host_key");
        load_or_generate(path.to_str().unwrap()).expect("generate");
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
