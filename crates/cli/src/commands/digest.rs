use ppom_core::integrity;
use std::path::Path;

use super::utils::{print_success, CliError, CliResult};

/// Prints the SHA-256 digest of `file`, optionally checking a detached
/// signature over it.
pub async fn digest_file(
    file: &Path,
    signature: Option<&str>,
    public_key: Option<&str>,
) -> CliResult<()> {
    let data = tokio::fs::read(file).await?;
    let checksum = integrity::digest(&data);
    println!("{checksum}  {}", file.display());

    if let Some(signature) = signature {
        let public_key = public_key.ok_or_else(|| {
            CliError::General("--public-key is required with --signature".to_string())
        })?;
        integrity::verify_signature(&data, signature, public_key, &file.display().to_string())
            .map_err(|e| CliError::Verification(e.to_string()))?;
        print_success("Signature is valid");
    }
    Ok(())
}
