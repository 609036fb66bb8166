//! Integration tests for Strata

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use tempfile::TempDir;

    const PIPELINE: &str = r#"
[base]
image = "python"
tag = "3.11-slim"

[packages]
install = ["ffmpeg", "curl"]

[workspace]
dir = "/app"

[dependencies]
toolchain = "pip"

[launch]
entry_point = "app:app"
"#;

    fn strata() -> Command {
        cargo_bin_cmd!("strata")
    }

    /// A minimal build context: pipeline, dependency manifest, one source file
    fn project() -> TempDir {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("strata.toml"), PIPELINE).unwrap();
        std::fs::write(temp.path().join("requirements.txt"), "flask==3.0.0\n").unwrap();
        std::fs::write(temp.path().join("app.py"), "app = object()\n").unwrap();
        temp
    }

    #[test]
    fn help_displays() {
        strata()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("build orchestrator"));
    }

    #[test]
    fn version_displays() {
        strata()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("strata"));
    }

    #[test]
    fn init_creates_pipeline() {
        let temp = TempDir::new().unwrap();
        strata()
            .args(["init", "--path"])
            .arg(temp.path())
            .assert()
            .success();

        let content = std::fs::read_to_string(temp.path().join("strata.toml")).unwrap();
        assert!(content.contains("[base]"));
        assert!(content.contains("[launch]"));
    }

    #[test]
    fn init_refuses_overwrite() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("strata.toml"), "existing").unwrap();

        strata()
            .args(["init", "--path"])
            .arg(temp.path())
            .assert()
            .failure()
            .stderr(predicate::str::contains("already exists"));
    }

    #[test]
    fn init_force_overwrites() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("strata.toml"), "old").unwrap();

        strata()
            .args(["init", "--force", "--path"])
            .arg(temp.path())
            .assert()
            .success();

        let content = std::fs::read_to_string(temp.path().join("strata.toml")).unwrap();
        assert!(content.contains("[base]"));
    }

    #[test]
    fn render_emits_ordered_containerfile() {
        let temp = project();
        let output = strata()
            .arg("-C")
            .arg(temp.path())
            .arg("render")
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();
        let containerfile = String::from_utf8(output).unwrap();

        let positions: Vec<usize> = [
            "FROM python:3.11-slim",
            "RUN apt-get update",
            "WORKDIR /app",
            "COPY requirements.txt ./",
            "COPY . .",
            "CMD gunicorn --bind 0.0.0.0:$PORT app:app",
        ]
        .iter()
        .map(|needle| {
            containerfile
                .find(needle)
                .unwrap_or_else(|| panic!("missing '{}' in:\n{}", needle, containerfile))
        })
        .collect();
        assert!(
            positions.windows(2).all(|w| w[0] < w[1]),
            "instructions out of order:\n{}",
            containerfile
        );

        // Install and index cleanup share one instruction
        assert!(containerfile.contains("rm -rf /var/lib/apt/lists/*"));
    }

    #[test]
    fn render_writes_output_file() {
        let temp = project();
        let out = temp.path().join("Containerfile");

        strata()
            .arg("-C")
            .arg(temp.path())
            .args(["render", "--output"])
            .arg(&out)
            .assert()
            .success();

        let containerfile = std::fs::read_to_string(&out).unwrap();
        assert!(containerfile.starts_with("FROM python:3.11-slim"));
    }

    #[test]
    fn plan_plain_lists_all_stages() {
        let temp = project();
        let state = TempDir::new().unwrap();

        let output = strata()
            .env("STRATA_STATE_DIR", state.path())
            .arg("-C")
            .arg(temp.path())
            .args(["plan", "--format", "plain"])
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();
        let stdout = String::from_utf8(output).unwrap();

        for stage in [
            "base",
            "system-packages",
            "workspace",
            "dependencies",
            "source",
            "launch",
        ] {
            assert!(stdout.contains(stage), "missing stage '{}':\n{}", stage, stdout);
        }
        // Nothing committed yet
        assert!(stdout.contains("miss"));
        assert!(!stdout.contains("hit"));
    }

    #[test]
    fn plan_json_is_parseable() {
        let temp = project();
        let state = TempDir::new().unwrap();

        let output = strata()
            .env("STRATA_STATE_DIR", state.path())
            .arg("-C")
            .arg(temp.path())
            .args(["plan", "--format", "json"])
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();

        let plan: serde_json::Value = serde_json::from_slice(&output).unwrap();
        assert_eq!(plan["stages"].as_array().unwrap().len(), 6);
        assert!(plan["image_tag"]
            .as_str()
            .unwrap()
            .starts_with("strata-build-"));
    }

    #[test]
    fn plan_fails_without_dependency_manifest() {
        let temp = project();
        std::fs::remove_file(temp.path().join("requirements.txt")).unwrap();
        let state = TempDir::new().unwrap();

        strata()
            .env("STRATA_STATE_DIR", state.path())
            .arg("-C")
            .arg(temp.path())
            .arg("plan")
            .assert()
            .failure()
            .stderr(predicate::str::contains("requirements.txt"));
    }

    #[test]
    fn missing_pipeline_shows_init_hint() {
        let temp = TempDir::new().unwrap();
        let state = TempDir::new().unwrap();

        strata()
            .env("STRATA_STATE_DIR", state.path())
            .arg("-C")
            .arg(temp.path())
            .arg("plan")
            .assert()
            .failure()
            .stderr(predicate::str::contains("strata init"));
    }

    #[test]
    fn invalid_pipeline_reports_reason() {
        let temp = project();
        std::fs::write(
            temp.path().join("strata.toml"),
            "[base]\nimage = \"python\"\ntag = \"latest\"\n\n[launch]\nentry_point = \"app:app\"\n",
        )
        .unwrap();
        let state = TempDir::new().unwrap();

        strata()
            .env("STRATA_STATE_DIR", state.path())
            .arg("-C")
            .arg(temp.path())
            .arg("render")
            .assert()
            .failure()
            .stderr(predicate::str::contains("latest"));
    }

    #[test]
    fn config_log_format_json_emits_json_logs() {
        let temp = project();
        let state = TempDir::new().unwrap();
        let config = temp.path().join("config.toml");
        std::fs::write(
            &config,
            "[general]\nverbose = true\nlog_format = \"json\"\n",
        )
        .unwrap();

        // The unpinned-package warning comes out as a JSON record on stderr
        strata()
            .env("STRATA_STATE_DIR", state.path())
            .arg("--config")
            .arg(&config)
            .arg("-C")
            .arg(temp.path())
            .args(["plan", "--format", "plain"])
            .assert()
            .success()
            .stderr(predicate::str::contains("\"level\":\"WARN\""));
    }

    #[test]
    fn cache_list_empty() {
        let state = TempDir::new().unwrap();

        strata()
            .env("STRATA_STATE_DIR", state.path())
            .args(["cache", "list"])
            .assert()
            .success()
            .stdout(predicate::str::contains("No committed stage keys"));
    }

    #[test]
    fn cache_gc_dry_run() {
        let state = TempDir::new().unwrap();

        strata()
            .env("STRATA_STATE_DIR", state.path())
            .args(["cache", "gc", "--dry-run"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Would remove"));
    }

    #[test]
    fn status_runs() {
        // Status reports even when no build tool is installed
        let temp = project();
        let state = TempDir::new().unwrap();

        strata()
            .env("STRATA_STATE_DIR", state.path())
            .arg("-C")
            .arg(temp.path())
            .arg("status")
            .assert()
            .success()
            .stdout(predicate::str::contains("Pipeline valid"));
    }

    #[test]
    fn build_fails_without_tool() {
        let temp = project();
        let state = TempDir::new().unwrap();
        let config = temp.path().join("config.toml");
        std::fs::write(&config, "[runtime]\nbinary = \"no-such-build-tool\"\n").unwrap();

        strata()
            .env("STRATA_STATE_DIR", state.path())
            .arg("--config")
            .arg(&config)
            .arg("-C")
            .arg(temp.path())
            .arg("build")
            .assert()
            .failure()
            .stderr(predicate::str::contains("no-such-build-tool"));
    }
}

mod pipeline_fidelity {
    use assert_cmd::cargo::cargo_bin_cmd;
    use serial_test::serial;
    use tempfile::TempDir;

    /// Plan output must be stable across invocations in the same context
    #[test]
    #[serial]
    fn plan_is_deterministic() {
        let temp = TempDir::new().unwrap();
        std::fs::write(
            temp.path().join("strata.toml"),
            "[base]\nimage = \"python\"\ntag = \"3.11-slim\"\n\n[launch]\nentry_point = \"app:app\"\n",
        )
        .unwrap();
        std::fs::write(temp.path().join("requirements.txt"), "flask==3.0.0\n").unwrap();
        std::fs::write(temp.path().join("app.py"), "app = object()\n").unwrap();
        let state = TempDir::new().unwrap();

        let run = || {
            let output = cargo_bin_cmd!("strata")
                .env("STRATA_STATE_DIR", state.path())
                .arg("-C")
                .arg(temp.path())
                .args(["plan", "--format", "plain"])
                .assert()
                .success()
                .get_output()
                .stdout
                .clone();
            String::from_utf8(output).unwrap()
        };

        assert_eq!(run(), run());
    }
}
