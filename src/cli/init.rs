//! Init command implementation
//!
//! Writes a starter `admissions.toml`, `.env.example`, `.gitignore` and the
//! `data/` directory the default SQLite database lives in.

use super::output::Output;
use super::MailChoice;
use std::fs;
use std::path::{Path, PathBuf};

/// Result of the init operation
pub enum InitResult {
    /// Initialization completed successfully
    Success,
    /// admissions.toml already exists
    AlreadyExists,
    /// An error occurred during initialization
    Error(String),
}

/// Configuration for the init command
pub struct InitConfig {
    /// Directory to initialize
    pub path: PathBuf,
    /// Overwrite existing files
    pub force: bool,
    /// Host address for the server
    pub host: String,
    /// Port for the server
    pub port: u16,
    /// Mail backend for reset links
    pub mail: MailChoice,
}

/// Run the init command
pub fn run(config: InitConfig, output: &Output) -> InitResult {
    output.banner();
    output.header("Initializing admissions server");

    let base_path = &config.path;

    let config_path = base_path.join("admissions.toml");
    if config_path.exists() && !config.force {
        output.warning("admissions.toml already exists!");
        output.hint("Use --force to overwrite existing files");
        return InitResult::AlreadyExists;
    }

    let data_dir = base_path.join("data");
    if data_dir.exists() {
        output.skipped("data", "already exists");
    } else if let Err(e) = fs::create_dir_all(&data_dir) {
        output.error(&format!("Failed to create data: {}", e));
        return InitResult::Error(e.to_string());
    } else {
        output.created("directory", "data");
    }

    let files = [
        ("admissions.toml", generate_admissions_toml(&config), config.force),
        (".env.example", generate_env_example(&config), config.force),
        (".gitignore", generate_gitignore(), false),
    ];

    for (name, content, force) in files {
        let path = base_path.join(name);
        if path.exists() && !force {
            output.skipped(name, "already exists");
            continue;
        }
        if let Err(e) = write_file(&path, &content, force) {
            output.error(&format!("Failed to create {}: {}", name, e));
            return InitResult::Error(e.to_string());
        }
        output.created("file", name);
    }

    output.success("Project initialized");

    output.header("Next Steps");
    output.info("1. Set up environment variables:");
    output.command("cp .env.example .env");
    output.command("# Edit .env and set JWT_SECRET (min 32 chars)");
    output.info("2. Create the first admin account:");
    output.command("admissions-server user create --email you@example.edu --name You --role admin");
    output.info("3. Start the server:");
    output.command("admissions-server");

    output.hint(&format!(
        "Server will be available at http://{}:{}",
        config.host, config.port
    ));
    output.hint("API docs available at /swagger-ui/ (requires 'swagger-ui' feature)");

    InitResult::Success
}

fn write_file(path: &Path, content: &str, force: bool) -> std::io::Result<()> {
    if path.exists() && !force {
        return Ok(());
    }
    fs::write(path, content)
}

fn generate_admissions_toml(config: &InitConfig) -> String {
    let mail_provider = match config.mail {
        MailChoice::Log => "log",
        MailChoice::Sendgrid => "sendgrid",
    };

    format!(
        r#"# Admissions Server Configuration
# Generated by: admissions-server init
#
# REQUIRED: set JWT_SECRET before starting (min 32 characters).
# Secrets are referenced by environment variable name, never stored here.
#
# Hot Reloading: allowed campuses, secure_cookies, trust_forwarded_for and
# mail.reset_url are re-read when this file changes. Other settings need a
# restart.

[server]
host = "{host}"
port = {port}
log_level = "info"
log_json = false
cors_origins = ["http://localhost:3000"]
# Log the X-Forwarded-For address; enable only behind a proxy that sets it
trust_forwarded_for = false

[auth]
jwt_secret_env = "JWT_SECRET"
# Session lifetime in seconds
access_token_expiry = 3600
# Password reset link lifetime in seconds
reset_token_expiry = 900
# Enable behind HTTPS
secure_cookies = false
allowed_campuses = ["Pilani", "Goa", "Hyderabad"]

[database]
url = "./data/admissions.db"
# Use a Turso database instead when both variables are set
# turso_url_env = "TURSO_URL"
# turso_token_env = "TURSO_AUTH_TOKEN"

[mail]
# "log" only logs reset links; "sendgrid" delivers them
provider = "{mail_provider}"
api_key_env = "SENDGRID_API_KEY"
sender = "admissions@example.edu"
reset_url = "http://localhost:3000/reset-password"

[upload]
max_file_bytes = 10485760
"#,
        host = config.host,
        port = config.port,
        mail_provider = mail_provider,
    )
}

fn generate_env_example(config: &InitConfig) -> String {
    let sendgrid = match config.mail {
        MailChoice::Sendgrid => "SENDGRID_API_KEY=SG.your-key-here\n",
        MailChoice::Log => "# SENDGRID_API_KEY=SG.your-key-here\n",
    };

    format!(
        r#"# Admissions Server Environment Variables
# Copy this file to .env and fill in the values.

# REQUIRED: JWT secret for session and reset tokens (minimum 32 characters)
# Generate with: openssl rand -base64 32
JWT_SECRET=change-me-in-production-use-at-least-32-characters

# Logging level (trace, debug, info, warn, error)
RUST_LOG=info,admissions=debug

# SendGrid API key (mail.provider = "sendgrid")
{sendgrid}
# Optional: Turso cloud database
# TURSO_URL=libsql://your-db.turso.io
# TURSO_AUTH_TOKEN=your-token
"#
    )
}

fn generate_gitignore() -> String {
    r#"# Admissions server data
/data/
*.db
*.db-journal

# Environment
.env
.env.local

# Rust
/target/
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_config(temp_dir: &TempDir) -> InitConfig {
        InitConfig {
            path: temp_dir.path().to_path_buf(),
            force: false,
            host: "127.0.0.1".to_string(),
            port: 8000,
            mail: MailChoice::Log,
        }
    }

    #[test]
    fn test_generated_toml_parses() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let mut config = create_test_config(&temp_dir);
        config.port = 9100;
        config.mail = MailChoice::Sendgrid;

        let parsed: crate::AdmissionsConfig =
            toml::from_str(&generate_admissions_toml(&config)).expect("generated TOML parses");

        assert_eq!(parsed.server.port, 9100);
        assert_eq!(
            parsed.mail.provider,
            crate::utils::toml_config::MailProvider::Sendgrid
        );
        assert_eq!(parsed.auth.allowed_campuses.len(), 3);
    }

    #[test]
    fn test_env_example_mentions_sendgrid_only_when_chosen() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let mut config = create_test_config(&temp_dir);

        assert!(generate_env_example(&config).contains("# SENDGRID_API_KEY"));
        config.mail = MailChoice::Sendgrid;
        assert!(generate_env_example(&config).contains("\nSENDGRID_API_KEY="));
    }

    #[test]
    fn test_write_file_skips_existing_without_force() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let file_path = temp_dir.path().join("test.txt");
        fs::write(&file_path, "original").expect("Failed to write");

        write_file(&file_path, "new content", false).unwrap();
        assert_eq!(fs::read_to_string(&file_path).unwrap(), "original");

        write_file(&file_path, "new content", true).unwrap();
        assert_eq!(fs::read_to_string(&file_path).unwrap(), "new content");
    }

    #[test]
    fn test_run_creates_all_files() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let result = run(create_test_config(&temp_dir), &Output::no_color());

        assert!(matches!(result, InitResult::Success));
        assert!(temp_dir.path().join("admissions.toml").exists());
        assert!(temp_dir.path().join(".env.example").exists());
        assert!(temp_dir.path().join(".gitignore").exists());
        assert!(temp_dir.path().join("data").is_dir());
    }

    #[test]
    fn test_run_already_exists_without_force() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        fs::write(temp_dir.path().join("admissions.toml"), "existing").expect("Failed to write");

        let result = run(create_test_config(&temp_dir), &Output::no_color());
        assert!(matches!(result, InitResult::AlreadyExists));
    }

    #[test]
    fn test_run_force_overwrites() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        fs::write(temp_dir.path().join("admissions.toml"), "existing").expect("Failed to write");

        let mut config = create_test_config(&temp_dir);
        config.force = true;
        let result = run(config, &Output::no_color());

        assert!(matches!(result, InitResult::Success));
        let content = fs::read_to_string(temp_dir.path().join("admissions.toml")).unwrap();
        assert!(content.contains("[server]"));
        assert!(!content.contains("existing"));
    }
}
