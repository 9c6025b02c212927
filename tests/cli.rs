// ABOUTME: End-to-end tests for the rollwright binary.
// ABOUTME: Drives init, run, classify, and phases through the real CLI.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn rollwright() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("rollwright"))
}

fn write_manifest(dir: &TempDir, yaml: &str) {
    std::fs::write(dir.path().join("rollwright.yml"), yaml).unwrap();
}

#[test]
fn help_lists_commands() {
    rollwright()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("init"))
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("classify"))
        .stdout(predicate::str::contains("phases"));
}

#[test]
fn quiet_and_json_conflict() {
    rollwright()
        .args(["--quiet", "--json", "phases"])
        .assert()
        .failure();
}

mod init {
    use super::*;

    #[test]
    fn creates_config_file() {
        let dir = TempDir::new().unwrap();
        rollwright()
            .current_dir(dir.path())
            .args(["init", "--stack", "billing", "--type", "spot"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Created rollwright.yml"));

        let content = std::fs::read_to_string(dir.path().join("rollwright.yml")).unwrap();
        assert!(content.contains("stack: billing"));
        assert!(content.contains("type: spot"));
    }

    #[test]
    fn refuses_to_overwrite() {
        let dir = TempDir::new().unwrap();
        rollwright().current_dir(dir.path()).arg("init").assert().success();
        rollwright()
            .current_dir(dir.path())
            .arg("init")
            .assert()
            .failure()
            .stderr(predicate::str::contains("already exists"));
        rollwright()
            .current_dir(dir.path())
            .args(["init", "--force"])
            .assert()
            .success();
    }

    #[test]
    fn rejects_invalid_stack_name() {
        let dir = TempDir::new().unwrap();
        rollwright()
            .current_dir(dir.path())
            .args(["init", "--stack", "9lives"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("invalid configuration"));
    }
}

mod classify {
    use super::*;

    #[test]
    fn prints_classification() {
        rollwright()
            .args([
                "classify",
                "An error occurred (Throttling) when calling the DescribeStacks operation",
            ])
            .assert()
            .success()
            .stdout(predicate::str::contains("error_code: Throttling"))
            .stdout(predicate::str::contains("category: RATE"))
            .stdout(predicate::str::contains("retryable: true"));
    }

    #[test]
    fn json_output_is_a_record() {
        let output = rollwright()
            .args(["--json", "classify", "AccessDenied for user", "--context", "iam:get-user"])
            .output()
            .unwrap();
        assert!(output.status.success());

        let line = String::from_utf8(output.stdout).unwrap();
        let value: serde_json::Value = serde_json::from_str(line.trim()).unwrap();
        assert_eq!(value["event"], "classification");
        assert_eq!(value["data"]["context"], "iam:get-user");
    }
}

mod phases {
    use super::*;

    #[test]
    fn lists_standard_catalog() {
        rollwright()
            .arg("phases")
            .assert()
            .success()
            .stdout(predicate::str::contains("validation"))
            .stdout(predicate::str::contains("cleanup"))
            .stdout(predicate::str::contains("optional"));
    }

    #[test]
    fn applies_manifest_timeouts() {
        let dir = TempDir::new().unwrap();
        write_manifest(
            &dir,
            "phases:\n  timeouts:\n    cleanup: 42s\ndeployments:\n  - { id: web, stack: web-stack, type: simple }\n",
        );
        rollwright()
            .current_dir(dir.path())
            .args(["phases", "--file", "rollwright.yml"])
            .assert()
            .success()
            .stdout(predicate::str::contains("42s"));
    }
}

mod run {
    use super::*;

    #[test]
    fn template_runs_in_dry_run_mode() {
        let dir = TempDir::new().unwrap();
        rollwright().current_dir(dir.path()).arg("init").assert().success();
        rollwright()
            .current_dir(dir.path())
            .arg("run")
            .assert()
            .success()
            .stdout(predicate::str::contains("status: completed"))
            .stdout(predicate::str::contains("1 deployment(s) completed"));
    }

    #[test]
    fn steps_see_deployment_environment() {
        let dir = TempDir::new().unwrap();
        write_manifest(
            &dir,
            r#"
phases:
  infrastructure:
    - name: record-stack
      run: printf '%s/%s' "$ROLLWRIGHT_STACK" "$ROLLWRIGHT_PHASE" > stack.txt
deployments:
  - id: web
    stack: web-stack
    type: simple
"#,
        );
        rollwright()
            .current_dir(dir.path())
            .arg("run")
            .assert()
            .success();

        let recorded = std::fs::read_to_string(dir.path().join("stack.txt")).unwrap();
        assert_eq!(recorded, "web-stack/infrastructure");
    }

    #[test]
    fn dry_run_flag_skips_steps() {
        let dir = TempDir::new().unwrap();
        write_manifest(
            &dir,
            r#"
phases:
  application:
    - name: touch
      run: touch ran.txt
deployments:
  - { id: web, stack: web-stack, type: simple }
"#,
        );
        rollwright()
            .current_dir(dir.path())
            .args(["run", "--dry-run"])
            .assert()
            .success();
        assert!(!dir.path().join("ran.txt").exists());
    }

    #[test]
    fn failing_step_rolls_back_and_exits_nonzero() {
        let dir = TempDir::new().unwrap();
        write_manifest(
            &dir,
            r#"
phases:
  infrastructure:
    - name: create-stack
      run: |
        echo "An error occurred (AccessDenied) when calling the CreateStack operation" >&2
        exit 1
rollback:
  recreate: touch recreated.txt
deployments:
  - { id: web, stack: web-stack, type: simple }
"#,
        );
        rollwright()
            .current_dir(dir.path())
            .arg("run")
            .assert()
            .failure()
            .stdout(predicate::str::contains("status: rolled_back"))
            .stderr(predicate::str::contains("failed in phase infrastructure"))
            .stderr(predicate::str::contains("1 of 1 deployment(s) did not complete"));
        assert!(dir.path().join("recreated.txt").exists());
    }

    #[test]
    fn only_runs_selection_with_dependencies() {
        let dir = TempDir::new().unwrap();
        write_manifest(
            &dir,
            r#"
deployments:
  - { id: network, stack: net-stack, type: simple }
  - { id: app, stack: app-stack, type: simple, dependencies: [network] }
  - { id: batch, stack: batch-stack, type: spot }
"#,
        );
        rollwright()
            .current_dir(dir.path())
            .args(["run", "--only", "app"])
            .assert()
            .success()
            .stdout(predicate::str::contains("id: network"))
            .stdout(predicate::str::contains("id: app"))
            .stdout(predicate::str::contains("id: batch").not())
            .stdout(predicate::str::contains("2 deployment(s) completed"));
    }

    #[test]
    fn unknown_selection_fails() {
        let dir = TempDir::new().unwrap();
        write_manifest(&dir, "deployments:\n  - { id: web, stack: web-stack, type: simple }\n");
        rollwright()
            .current_dir(dir.path())
            .args(["run", "--only", "ghost"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("unknown deployment in manifest: ghost"));
    }

    #[test]
    fn structured_format_prints_json() {
        let dir = TempDir::new().unwrap();
        write_manifest(&dir, "deployments:\n  - { id: web, stack: web-stack, type: simple }\n");
        rollwright()
            .current_dir(dir.path())
            .args(["run", "--format", "structured"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"status\": \"completed\""));
    }

    #[test]
    fn missing_config_fails() {
        let dir = TempDir::new().unwrap();
        rollwright()
            .current_dir(dir.path())
            .arg("run")
            .assert()
            .failure()
            .stderr(predicate::str::contains("configuration file not found"));
    }
}
