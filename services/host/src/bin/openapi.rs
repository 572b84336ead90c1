//! services/host/src/bin/openapi.rs
//!
//! Writes the OpenAPI document for the session host's REST surface (liveness and
//! reflection eligibility) so clients can be generated without a running host.
//! The WebSocket session protocol is not described by the document.
//!
//! Usage: `openapi [OUTPUT]`. Without an argument the document goes to
//! `openapi.json` in the current directory.

use std::path::{Path, PathBuf};

use host_lib::{error::HostError, web::rest::ApiDoc};
use utoipa::OpenApi;

const DEFAULT_OUTPUT: &str = "openapi.json";

fn output_path(mut args: impl Iterator<Item = String>) -> PathBuf {
    args.next().map(PathBuf::from).unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT))
}

/// Renders the host's API document to `path` and returns how many paths it documents.
fn write_document(path: &Path) -> Result<usize, HostError> {
    let document = ApiDoc::openapi();
    std::fs::write(path, document.to_pretty_json()?)?;
    Ok(document.paths.paths.len())
}

fn main() -> Result<(), HostError> {
    let path = output_path(std::env::args().skip(1));
    let documented = write_document(&path)?;
    println!("Session host API ({documented} paths) written to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_defaults_to_openapi_json() {
        assert_eq!(output_path(std::iter::empty()), PathBuf::from("openapi.json"));
        assert_eq!(output_path(["docs/host.json".to_string()].into_iter()), PathBuf::from("docs/host.json"));
    }

    #[test]
    fn written_document_describes_eligibility() {
        let path = std::env::temp_dir().join(format!("host-openapi-{}.json", uuid::Uuid::new_v4()));

        let documented = write_document(&path).unwrap();
        let written: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(documented, 2);
        assert!(written["paths"]["/videos/{video_id}/eligibility"]["get"]["responses"]["404"].is_object());
    }
}
