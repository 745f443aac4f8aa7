#![allow(dead_code)]

use convert_service::config::ConvertConfig;
use convert_service::startup::Application;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tempfile::TempDir;

/// Minimal PDF the stub converters write.
pub const STUB_PDF: &[u8] = b"%PDF-1.4\n% converter stub\n%%EOF\n";

/// Diagnostic line printed by the failing stub.
pub const STUB_FAILURE_OUTPUT: &str = "Error: source file could not be loaded";

/// Shell stand-ins for LibreOffice. They honour the same CLI contract:
/// `--outdir <dir>` somewhere in the arguments, input path last.
#[derive(Debug, Clone, Copy)]
pub enum Stub {
    /// Writes `<stem>.pdf`.
    PlainName,
    /// Writes `<stem>_output.pdf`.
    SuffixedName,
    /// Writes both names with different contents.
    BothNames,
    /// Prints diagnostics and exits 3.
    Fails,
    /// Exits 0 without writing anything.
    Silent,
    /// Sleeps longer than any test timeout.
    Hangs,
}

const ARG_PARSING: &str = r#"outdir=""
while [ $# -gt 1 ]; do
  if [ "$1" = "--outdir" ]; then
    outdir="$2"
    shift
  fi
  shift
done
name=$(basename "$1")
stem="${name%.*}"
"#;

impl Stub {
    fn file_name(self) -> &'static str {
        match self {
            Stub::PlainName => "plain-name.sh",
            Stub::SuffixedName => "suffixed-name.sh",
            Stub::BothNames => "both-names.sh",
            Stub::Fails => "fails.sh",
            Stub::Silent => "silent.sh",
            Stub::Hangs => "hangs.sh",
        }
    }

    fn script(self) -> String {
        let body = match self {
            Stub::PlainName => format!(
                "{}printf '%s' \"$STUB_PDF\" > \"$outdir/$stem.pdf\"\necho \"convert $1 -> $outdir/$stem.pdf\"\n",
                ARG_PARSING
            ),
            Stub::SuffixedName => format!(
                "{}printf '%s' \"$STUB_PDF\" > \"$outdir/${{stem}}_output.pdf\"\n",
                ARG_PARSING
            ),
            Stub::BothNames => format!(
                "{}printf '%s' \"$STUB_PDF\" > \"$outdir/${{stem}}_output.pdf\"\nprintf '%%PDF-wrong-candidate' > \"$outdir/$stem.pdf\"\n",
                ARG_PARSING
            ),
            Stub::Fails => format!("echo \"{}\" >&2\nexit 3\n", STUB_FAILURE_OUTPUT),
            Stub::Silent => "exit 0\n".to_string(),
            Stub::Hangs => "sleep 30\n".to_string(),
        };
        let pdf = String::from_utf8_lossy(STUB_PDF);
        format!("#!/bin/sh\nSTUB_PDF='{}'\n{}", pdf, body)
    }

    /// Path of the executable stub, written once per test binary.
    pub fn path(self) -> PathBuf {
        stub_dir().join(self.file_name())
    }
}

/// All stubs are written before any test spawns one, so no process can
/// inherit an open write handle to a script (ETXTBSY).
fn stub_dir() -> &'static Path {
    static STUBS: OnceLock<PathBuf> = OnceLock::new();
    STUBS.get_or_init(|| {
        let dir = Path::new(env!("CARGO_TARGET_TMPDIR"))
            .join(format!("converter-stubs-{}", std::process::id()));
        std::fs::create_dir_all(&dir).expect("Failed to create stub directory");

        for stub in [
            Stub::PlainName,
            Stub::SuffixedName,
            Stub::BothNames,
            Stub::Fails,
            Stub::Silent,
            Stub::Hangs,
        ] {
            let path = dir.join(stub.file_name());
            std::fs::write(&path, stub.script()).expect("Failed to write stub");
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
                .expect("Failed to make stub executable");
        }
        dir
    })
}

pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub staging_root: TempDir,
}

impl TestApp {
    pub async fn spawn(stub: Stub) -> Self {
        Self::spawn_with(stub.path(), None).await
    }

    pub async fn spawn_with(program: impl Into<PathBuf>, timeout_secs: Option<u64>) -> Self {
        let program = program.into();
        Self::spawn_configured(move |config| {
            config.converter.program = program.to_string_lossy().into_owned();
            config.converter.timeout_secs = timeout_secs;
        })
        .await
    }

    /// Spawns with `stub` and an upload limit of `max_bytes`.
    pub async fn spawn_with_upload_limit(stub: Stub, max_bytes: usize) -> Self {
        Self::spawn_configured(move |config| {
            config.converter.program = stub.path().to_string_lossy().into_owned();
            config.upload.max_bytes = max_bytes;
        })
        .await
    }

    /// Test defaults (port 0, per-test staging root, `PlainName` stub) with
    /// `configure` applied on top.
    pub async fn spawn_configured(configure: impl FnOnce(&mut ConvertConfig)) -> Self {
        // Materialize stubs before the server can fork anything.
        stub_dir();

        let staging_root = TempDir::new().expect("Failed to create staging root");

        let mut config = ConvertConfig::default();
        config.common.port = 0; // Random port for testing
        config.converter.program = Stub::PlainName.path().to_string_lossy().into_owned();
        configure(&mut config);
        config.staging.root = Some(staging_root.path().to_path_buf());

        let app = Application::build(config)
            .await
            .expect("Failed to build test application");

        let port = app.port();
        let address = format!("http://127.0.0.1:{}", port);

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        // Wait for HTTP server to be ready by polling health endpoint
        let client = reqwest::Client::new();
        let health_url = format!("{}/health", address);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
        }

        TestApp {
            address,
            port,
            staging_root,
        }
    }

    /// Uploads `bytes` as the `file` field under `file_name`.
    pub async fn convert(&self, file_name: &str, bytes: Vec<u8>) -> reqwest::Response {
        convert_at(&self.address, file_name, bytes).await
    }

    pub async fn post_form(&self, form: reqwest::multipart::Form) -> reqwest::Response {
        reqwest::Client::new()
            .post(format!("{}/convert", self.address))
            .multipart(form)
            .send()
            .await
            .expect("Failed to execute request")
    }

    /// Entries left under the staging root.
    pub fn staging_entries(&self) -> Vec<PathBuf> {
        std::fs::read_dir(self.staging_root.path())
            .expect("Failed to read staging root")
            .map(|entry| entry.expect("Failed to read staging entry").path())
            .collect()
    }
}

pub async fn convert_at(address: &str, file_name: &str, bytes: Vec<u8>) -> reqwest::Response {
    let form = reqwest::multipart::Form::new().part(
        "file",
        reqwest::multipart::Part::bytes(bytes).file_name(file_name.to_string()),
    );
    reqwest::Client::new()
        .post(format!("{}/convert", address))
        .multipart(form)
        .send()
        .await
        .expect("Failed to execute request")
}

/// Bytes that look enough like a DOCX (zip container) for the stubs.
pub fn sample_docx() -> Vec<u8> {
    let mut bytes = b"PK\x03\x04".to_vec();
    bytes.extend(std::iter::repeat(0u8).take(512));
    bytes
}
