// ABOUTME: Integration tests for manifest parsing and config scaffolding.
// ABOUTME: Covers defaults, validation, env interpolation, and phase overrides.

use rollwright::config::{self, CONFIG_FILENAME, Manifest, ScalarValue};
use rollwright::deploy::PhaseName;
use rollwright::error::Error;
use rollwright::retry::ServiceClass;
use std::time::Duration;
use tempfile::TempDir;

const MINIMAL: &str = r#"
deployments:
  - id: web
    stack: web-stack
    type: simple
"#;

#[test]
fn minimal_manifest_uses_defaults() {
    let manifest = Manifest::from_yaml(MINIMAL).unwrap();
    assert_eq!(manifest.region, "us-east-1");
    assert_eq!(manifest.retry.failure_threshold, 5);
    assert_eq!(manifest.retry.recovery_timeout, Duration::from_secs(300));
    assert!(manifest.notifications.is_none());
    assert_eq!(manifest.deployments.len(), 1);

    let web = manifest.deployment("web").unwrap();
    assert_eq!(web.stack, "web-stack");
    assert_eq!(web.deployment_type, "simple");
    assert!(manifest.overrides_for(web).unwrap().is_empty());
}

#[test]
fn full_manifest_parses() {
    let yaml = r#"
region: eu-west-1
retry:
  failure_threshold: 3
  recovery_timeout: 2m
  attempt_timeout: 90s
phases:
  validation:
    credentials: aws sts get-caller-identity
  preparation:
    backup: ./backup.sh
  infrastructure:
    - name: network
      service: cloudformation
      run: ./network.sh
      max_attempts: 2
      env:
        TIER: prod
  cleanup:
    - name: tmp
      run: rm -rf ./tmp
  timeouts:
    infrastructure: 45m
rollback:
  recreate: ./recreate.sh
  blue-green: ./switch.sh
deployments:
  - id: network
    stack: net-stack
    type: ondemand
  - id: app
    stack: app-stack
    type: spot
    dependencies: [network]
    rollback_strategy: blue_green
    region: us-west-2
    options:
      timeout: 900
      dryRun: false
      label: canary
"#;
    let manifest = Manifest::from_yaml(yaml).unwrap();
    assert_eq!(manifest.region, "eu-west-1");
    assert_eq!(manifest.retry.failure_threshold, 3);
    assert_eq!(manifest.retry.recovery_timeout, Duration::from_secs(120));
    assert_eq!(manifest.retry.attempt_timeout, Duration::from_secs(90));
    assert_eq!(manifest.retry.max_delay, Duration::from_secs(60));
    assert_eq!(manifest.rollback.blue_green.as_deref(), Some("./switch.sh"));

    let plan = manifest.phases.plan().unwrap();
    assert_eq!(plan.credentials_probe.as_deref(), Some("aws sts get-caller-identity"));
    assert_eq!(plan.backup_command.as_deref(), Some("./backup.sh"));
    assert_eq!(plan.infrastructure.len(), 1);
    assert_eq!(plan.infrastructure[0].service, ServiceClass::CloudFormation);
    assert_eq!(plan.infrastructure[0].max_attempts, Some(2));
    assert_eq!(plan.infrastructure[0].env["TIER"], "prod");
    assert_eq!(plan.cleanup[0].service, ServiceClass::Generic);
    assert!(plan.application.is_empty());

    let app = manifest.deployment("app").unwrap();
    assert_eq!(app.options["timeout"], ScalarValue::Integer(900));
    assert_eq!(app.options["dryRun"], ScalarValue::Bool(false));

    let overrides = manifest.overrides_for(app).unwrap();
    assert_eq!(overrides["timeout"], "900");
    assert_eq!(overrides["dryRun"], "false");
    assert_eq!(overrides["label"], "canary");
    assert_eq!(overrides["dependencies"], "network");
    assert_eq!(overrides["rollbackStrategy"], "blue_green");
    assert_eq!(overrides["region"], "us-west-2");
}

#[test]
fn dependencies_accept_comma_separated_string() {
    let yaml = r#"
deployments:
  - { id: a, stack: a-stack, type: simple }
  - { id: b, stack: b-stack, type: simple }
  - { id: c, stack: c-stack, type: simple, dependencies: "a, b" }
"#;
    let manifest = Manifest::from_yaml(yaml).unwrap();
    assert_eq!(manifest.deployment("c").unwrap().dependencies, vec!["a", "b"]);
}

mod rejected {
    use super::*;

    fn invalid(yaml: &str) -> String {
        match Manifest::from_yaml(yaml).unwrap_err() {
            Error::InvalidConfig(msg) => msg,
            Error::Yaml(e) => e.to_string(),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn empty_deployment_list() {
        assert!(invalid("deployments: []\n").contains("at least one deployment"));
    }

    #[test]
    fn duplicate_ids() {
        let msg = invalid(
            "deployments:\n  - { id: a, stack: s, type: simple }\n  - { id: a, stack: t, type: simple }\n",
        );
        assert!(msg.contains("duplicate deployment id 'a'"));
    }

    #[test]
    fn unknown_dependency() {
        let msg = invalid(
            "deployments:\n  - { id: a, stack: s, type: simple, dependencies: [ghost] }\n",
        );
        assert!(msg.contains("unknown deployment 'ghost'"));
    }

    #[test]
    fn self_dependency() {
        let msg = invalid("deployments:\n  - { id: a, stack: s, type: simple, dependencies: [a] }\n");
        assert!(msg.contains("depends on itself"));
    }

    #[test]
    fn id_with_list_separator() {
        let msg = invalid("deployments:\n  - { id: 'web,api', stack: s, type: simple }\n");
        assert!(msg.contains("must not contain whitespace or commas"));
    }

    #[test]
    fn blank_stack() {
        let msg = invalid("deployments:\n  - { id: a, stack: '  ', type: simple }\n");
        assert!(msg.contains("must not be empty"));
    }

    #[test]
    fn unknown_field() {
        let msg = invalid("regoin: x\ndeployments:\n  - { id: a, stack: s, type: simple }\n");
        assert!(msg.contains("regoin"));
    }

    #[test]
    fn step_without_command() {
        let yaml = "phases:\n  application:\n    - { name: deploy, run: ' ' }\ndeployments:\n  - { id: a, stack: s, type: simple }\n";
        let manifest = Manifest::from_yaml(yaml).unwrap();
        assert!(matches!(manifest.phases.plan(), Err(Error::InvalidConfig(_))));
    }
}

mod environment {
    use super::*;

    const WITH_WEBHOOK: &str = r#"
notifications:
  webhook_url:
    env: ROLLWRIGHT_TEST_WEBHOOK
deployments:
  - id: web
    stack: web-stack
    type: simple
"#;

    #[test]
    fn webhook_resolves_from_environment() {
        temp_env::with_var("ROLLWRIGHT_TEST_WEBHOOK", Some("http://hooks.internal/deploy"), || {
            let manifest = Manifest::from_yaml(WITH_WEBHOOK).unwrap();
            let overrides = manifest
                .overrides_for(manifest.deployment("web").unwrap())
                .unwrap();
            assert_eq!(overrides["webhookUrl"], "http://hooks.internal/deploy");
            assert_eq!(overrides["notificationsEnabled"], "true");
        });
    }

    #[test]
    fn missing_webhook_variable_is_an_error() {
        temp_env::with_var_unset("ROLLWRIGHT_TEST_WEBHOOK", || {
            let manifest = Manifest::from_yaml(WITH_WEBHOOK).unwrap();
            let err = manifest
                .overrides_for(manifest.deployment("web").unwrap())
                .unwrap_err();
            assert!(matches!(
                err,
                Error::MissingEnvVar { ref var, ref field }
                    if var == "ROLLWRIGHT_TEST_WEBHOOK" && field == "notifications.webhook_url"
            ));
        });
    }

    #[test]
    fn env_default_applies_when_unset() {
        let yaml = r#"
deployments:
  - id: web
    stack: web-stack
    type: simple
    options:
      webhookUrl:
        env: ROLLWRIGHT_TEST_UNSET_HOOK
        default: http://localhost:8080/hook
"#;
        temp_env::with_var_unset("ROLLWRIGHT_TEST_UNSET_HOOK", || {
            let manifest = Manifest::from_yaml(yaml).unwrap();
            let overrides = manifest
                .overrides_for(manifest.deployment("web").unwrap())
                .unwrap();
            assert_eq!(overrides["webhookUrl"], "http://localhost:8080/hook");
        });
    }

    #[test]
    fn empty_variable_falls_back_to_default() {
        let yaml = r#"
deployments:
  - id: web
    stack: web-stack
    type: simple
    options:
      webhookUrl:
        env: ROLLWRIGHT_TEST_EMPTY_HOOK
        default: http://localhost:8080/hook
"#;
        temp_env::with_var("ROLLWRIGHT_TEST_EMPTY_HOOK", Some(""), || {
            let manifest = Manifest::from_yaml(yaml).unwrap();
            let overrides = manifest
                .overrides_for(manifest.deployment("web").unwrap())
                .unwrap();
            assert_eq!(overrides["webhookUrl"], "http://localhost:8080/hook");
        });
    }

    #[test]
    fn step_env_cannot_shadow_deployment_variables() {
        let yaml = r#"
phases:
  application:
    - name: deploy
      run: ./deploy.sh
      env:
        ROLLWRIGHT_STACK: elsewhere
deployments:
  - { id: web, stack: web-stack, type: simple }
"#;
        let err = Manifest::from_yaml(yaml).unwrap().phases.plan().unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(ref m) if m.contains("ROLLWRIGHT_STACK")));
    }

    #[test]
    fn step_env_resolves_from_environment() {
        let yaml = r#"
phases:
  verification:
    - name: smoke
      run: ./smoke.sh
      env:
        TOKEN:
          env: ROLLWRIGHT_TEST_TOKEN
deployments:
  - { id: web, stack: web-stack, type: simple }
"#;
        temp_env::with_var("ROLLWRIGHT_TEST_TOKEN", Some("s3cret"), || {
            let plan = Manifest::from_yaml(yaml).unwrap().phases.plan().unwrap();
            assert_eq!(plan.verification[0].env["TOKEN"], "s3cret");
        });
    }
}

mod catalog {
    use super::*;

    #[test]
    fn timeouts_override_standard_catalog() {
        let yaml = r#"
phases:
  timeouts:
    verification: 90s
    cleanup: 1m
deployments:
  - { id: web, stack: web-stack, type: simple }
"#;
        let catalog = Manifest::from_yaml(yaml).unwrap().phases.catalog().unwrap();
        assert_eq!(catalog.len(), 6);
        assert_eq!(
            catalog.get(PhaseName::Verification).unwrap().timeout,
            Duration::from_secs(90)
        );
        assert_eq!(
            catalog.get(PhaseName::Cleanup).unwrap().timeout,
            Duration::from_secs(60)
        );
        assert_eq!(
            catalog.get(PhaseName::Infrastructure).unwrap().timeout,
            Duration::from_secs(1800)
        );
        let names: Vec<PhaseName> = catalog.names().collect();
        assert_eq!(names, PhaseName::ALL.to_vec());
    }
}

mod scaffolding {
    use super::*;

    #[test]
    fn init_writes_loadable_template() {
        let dir = TempDir::new().unwrap();
        config::init_config(dir.path(), None, None, false).unwrap();

        let manifest = Manifest::discover(dir.path()).unwrap();
        let first = manifest.deployments.first();
        assert_eq!(first.id, "my-app");
        assert_eq!(first.deployment_type, "simple");
        assert_eq!(first.options["dryRun"], ScalarValue::Bool(true));

        let plan = manifest.phases.plan().unwrap();
        assert_eq!(plan.infrastructure[0].name, "deploy-stack");
    }

    #[test]
    fn init_uses_given_stack_and_type() {
        let dir = TempDir::new().unwrap();
        config::init_config(dir.path(), Some("billing"), Some("spot"), false).unwrap();

        let manifest = Manifest::load(&dir.path().join(CONFIG_FILENAME)).unwrap();
        assert_eq!(manifest.deployments.first().stack, "billing");
        assert_eq!(manifest.deployments.first().deployment_type, "spot");
    }

    #[test]
    fn init_rejects_unknown_type() {
        let dir = TempDir::new().unwrap();
        let err = config::init_config(dir.path(), None, Some("mainframe"), false).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
        assert!(!dir.path().join(CONFIG_FILENAME).exists());
    }

    #[test]
    fn init_refuses_to_overwrite_without_force() {
        let dir = TempDir::new().unwrap();
        config::init_config(dir.path(), None, None, false).unwrap();

        let err = config::init_config(dir.path(), None, None, false).unwrap_err();
        assert!(matches!(err, Error::AlreadyExists(_)));
        config::init_config(dir.path(), Some("replaced"), None, true).unwrap();
        let manifest = Manifest::discover(dir.path()).unwrap();
        assert_eq!(manifest.deployments.first().stack, "replaced");
    }

    #[test]
    fn discover_finds_alternate_locations() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join(".rollwright")).unwrap();
        std::fs::write(dir.path().join(".rollwright/config.yml"), MINIMAL).unwrap();
        assert!(Manifest::discover(dir.path()).is_ok());
    }

    #[test]
    fn discover_without_config_fails() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            Manifest::discover(dir.path()),
            Err(Error::ConfigNotFound(_))
        ));
    }
}
