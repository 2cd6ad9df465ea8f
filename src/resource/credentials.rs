//! # Credential Extraction
//!
//! Reads raw credential bytes from the source a ProviderConfig declares.
//!
//! Supported sources:
//! - `Secret` - a key of a Kubernetes Secret (`secretRef`)
//! - `Environment` - an environment variable of the provider process (`env`)
//! - `Filesystem` - a file mounted into the provider pod (`fs`)
//!
//! Returned bytes are wiped when dropped.

use std::path::{Component, Path, PathBuf};

use thiserror::Error;
use tracing::debug;
use zeroize::Zeroizing;

use crate::crd::{CommonCredentialSelectors, CredentialsSource};
use crate::store::{ConfigStore, StoreError};

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("cannot extract from secret key when none specified")]
    MissingSecretRef,
    #[error("cannot get credentials secret: {0}")]
    GetSecret(#[source] StoreError),
    #[error("cannot extract from environment variable when none specified")]
    MissingEnv,
    #[error("cannot extract from filesystem when no path specified")]
    MissingFs,
    #[error("cannot read credentials file {path:?}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("credentials source {0} is not currently supported")]
    UnsupportedSource(CredentialsSource),
}

/// Extract credentials from the given source using the matching selector.
pub async fn common_credential_extractor<S>(
    source: CredentialsSource,
    store: &S,
    selectors: &CommonCredentialSelectors,
) -> Result<Zeroizing<Vec<u8>>, ExtractError>
where
    S: ConfigStore + ?Sized,
{
    debug!("Extracting credentials from source {}", source);
    match source {
        CredentialsSource::Secret => extract_secret(store, selectors).await,
        CredentialsSource::Environment => extract_env(selectors),
        CredentialsSource::Filesystem => extract_fs(selectors).await,
        CredentialsSource::None | CredentialsSource::InjectedIdentity => {
            Err(ExtractError::UnsupportedSource(source))
        }
    }
}

/// Value of `secretRef.key` in the referenced Secret.
/// A missing key yields empty bytes.
pub async fn extract_secret<S>(
    store: &S,
    selectors: &CommonCredentialSelectors,
) -> Result<Zeroizing<Vec<u8>>, ExtractError>
where
    S: ConfigStore + ?Sized,
{
    let secret_ref = selectors
        .secret_ref
        .as_ref()
        .ok_or(ExtractError::MissingSecretRef)?;

    let secret = store
        .get_secret(&secret_ref.namespace, &secret_ref.name)
        .await
        .map_err(ExtractError::GetSecret)?;

    let bytes = secret
        .data
        .and_then(|mut data| data.remove(&secret_ref.key))
        .map(|value| value.0)
        .unwrap_or_default();

    Ok(Zeroizing::new(bytes))
}

/// Raw bytes of the `env.name` environment variable, empty when unset.
/// Bytes are passed through unchanged, even when not valid UTF-8.
pub fn extract_env(
    selectors: &CommonCredentialSelectors,
) -> Result<Zeroizing<Vec<u8>>, ExtractError> {
    let env = selectors.env.as_ref().ok_or(ExtractError::MissingEnv)?;
    let value = std::env::var_os(&env.name)
        .map(std::ffi::OsString::into_encoded_bytes)
        .unwrap_or_default();
    Ok(Zeroizing::new(value))
}

/// Contents of the file at `fs.path`.
pub async fn extract_fs(
    selectors: &CommonCredentialSelectors,
) -> Result<Zeroizing<Vec<u8>>, ExtractError> {
    let fs = selectors.fs.as_ref().ok_or(ExtractError::MissingFs)?;
    let path = clean_path(Path::new(&fs.path));
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|source| ExtractError::ReadFile { path, source })?;
    Ok(Zeroizing::new(bytes))
}

/// Lexically normalize a path: drop `.` segments and fold `..` into the parent.
fn clean_path(path: &Path) -> PathBuf {
    let mut cleaned = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !cleaned.pop() && !path.is_absolute() {
                    cleaned.push("..");
                }
            }
            other => cleaned.push(other.as_os_str()),
        }
    }
    if cleaned.as_os_str().is_empty() {
        cleaned.push(".");
    }
    cleaned
}
