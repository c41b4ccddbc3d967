//! Integration tests for lokoctl commands

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use tempfile::TempDir;

const CLUSTER: &str = r#"
variables:
  domain: example.com
components:
  contour:
    service_type: NodePort
    ingress_hosts: ["*.apps.${var.domain}"]
  flatcar-linux-update-operator:
"#;

fn lokoctl() -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_lokoctl"));
    command
        .env_remove("LOKO_CONFIG")
        .env_remove("LOKO_LOG")
        .env_remove("PACKET_AUTH_TOKEN")
        .env_remove("PACKET_API_URL");
    command
}

/// Run lokoctl with closed standard input
fn run(args: &[&str]) -> Output {
    lokoctl()
        .args(args)
        .stdin(Stdio::null())
        .output()
        .expect("Failed to execute lokoctl")
}

fn write_config(dir: &TempDir, content: &str) -> PathBuf {
    let path = dir.path().join("cluster.yaml");
    std::fs::write(&path, content).unwrap();
    path
}

fn path_arg(path: &Path) -> &str {
    path.to_str().unwrap()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

mod list_command {
    use super::*;

    #[test]
    fn test_list_components() {
        let output = run(&["component", "list"]);

        assert!(output.status.success());
        let stdout = stdout(&output);
        assert!(stdout.contains("cluster-autoscaler"));
        assert!(stdout.contains("projectcontour"));
        assert!(stdout.contains("reboot-coordinator"));
    }

    #[test]
    fn test_list_json() {
        let output = run(&["component", "list", "--json"]);

        let json: serde_json::Value =
            serde_json::from_str(&stdout(&output)).expect("Output should be valid JSON");
        let names: Vec<_> = json
            .as_array()
            .unwrap()
            .iter()
            .map(|m| m["name"].as_str().unwrap())
            .collect();
        assert_eq!(
            names,
            vec!["cluster-autoscaler", "contour", "flatcar-linux-update-operator"]
        );
        assert_eq!(json[1]["namespace_labels"]["lokomotive.kinvolk.io/name"], "projectcontour");
    }
}

mod validate_command {
    use super::*;

    #[test]
    fn test_validate_valid_config() {
        let dir = TempDir::new().unwrap();
        let config = write_config(&dir, CLUSTER);

        let output = run(&["component", "validate", "-c", path_arg(&config)]);

        assert!(output.status.success(), "{}", stderr(&output));
        assert!(stdout(&output).contains("Validation passed"));
    }

    #[test]
    fn test_validate_config_from_env() {
        let dir = TempDir::new().unwrap();
        let config = write_config(&dir, CLUSTER);

        let output = lokoctl()
            .args(["component", "validate"])
            .env("LOKO_CONFIG", &config)
            .output()
            .unwrap();

        assert!(output.status.success(), "{}", stderr(&output));
    }

    #[test]
    fn test_validate_reports_every_error() {
        let dir = TempDir::new().unwrap();
        let config = write_config(
            &dir,
            r#"
components:
  contour:
    service_type: ClusterIP
    enable_monitoring: maybe
"#,
        );

        let output = run(&["component", "validate", "-c", path_arg(&config)]);

        assert_eq!(output.status.code(), Some(2));
        let stdout = stdout(&output);
        assert!(stdout.contains("Unknown service type \"ClusterIP\""));
        assert!(stdout.contains("2 errors"));
    }

    #[test]
    fn test_validate_json_output() {
        let dir = TempDir::new().unwrap();
        let config = write_config(&dir, "components:\n  contour:\n    service_type: ClusterIP\n");

        let output = run(&["component", "validate", "-c", path_arg(&config), "--json"]);

        assert_eq!(output.status.code(), Some(2));
        let json: serde_json::Value =
            serde_json::from_str(&stdout(&output)).expect("Output should be valid JSON");
        assert_eq!(json["valid"], false);
        assert_eq!(json["components"]["contour"][0]["severity"], "error");
    }

    #[test]
    fn test_validate_unknown_component() {
        let dir = TempDir::new().unwrap();
        let config = write_config(&dir, "components:\n  contuor: {}\n");

        let output = run(&["component", "validate", "-c", path_arg(&config)]);

        assert_eq!(output.status.code(), Some(4));
        assert!(stderr(&output).contains("Did you mean 'contour'?"));
    }

    #[test]
    fn test_validate_missing_config() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing.yaml");

        let output = run(&["component", "validate", "-c", path_arg(&missing)]);

        assert_eq!(output.status.code(), Some(5));
    }

    #[test]
    fn test_validate_selected_component_not_configured() {
        let dir = TempDir::new().unwrap();
        let config = write_config(&dir, "components:\n  flatcar-linux-update-operator:\n");

        let output = run(&["component", "validate", "-c", path_arg(&config), "contour"]);

        assert_eq!(output.status.code(), Some(2));
        assert!(stderr(&output).contains("is not configured"));
    }
}

mod render_command {
    use super::*;

    #[test]
    fn test_render_to_stdout() {
        let dir = TempDir::new().unwrap();
        let config = write_config(&dir, CLUSTER);

        let output = run(&["component", "render", "-c", path_arg(&config)]);

        assert!(output.status.success(), "{}", stderr(&output));
        let stdout = stdout(&output);
        assert!(stdout.contains("# Source: contour/contour/templates/envoy-service.yaml"));
        assert!(stdout.contains("# Source: flatcar-linux-update-operator/update-agent.yaml"));
        assert!(stdout.contains("*.apps.example.com"));
    }

    #[test]
    fn test_render_to_directory() {
        let dir = TempDir::new().unwrap();
        let config = write_config(&dir, CLUSTER);
        let out = dir.path().join("manifests");

        let output = run(&[
            "component",
            "render",
            "-c",
            path_arg(&config),
            "--output",
            path_arg(&out),
            "contour",
        ]);

        assert!(output.status.success(), "{}", stderr(&output));
        assert!(out.join("contour/contour/crds/httpproxies.yaml").exists());
        assert!(!out.join("flatcar-linux-update-operator").exists());

        let service =
            std::fs::read_to_string(out.join("contour/contour/templates/envoy-service.yaml"))
                .unwrap();
        let doc: serde_yaml::Value = serde_yaml::from_str(&service).unwrap();
        assert_eq!(doc["spec"]["type"], "NodePort");
    }

    #[test]
    fn test_render_with_variable_override() {
        let dir = TempDir::new().unwrap();
        let config = write_config(&dir, CLUSTER);

        let output = run(&[
            "component",
            "render",
            "-c",
            path_arg(&config),
            "--var",
            "domain=example.org",
            "contour",
        ]);

        assert!(output.status.success(), "{}", stderr(&output));
        assert!(stdout(&output).contains("*.apps.example.org"));
    }

    #[test]
    fn test_render_is_deterministic() {
        let dir = TempDir::new().unwrap();
        let config = write_config(&dir, CLUSTER);

        let first = run(&["component", "render", "-c", path_arg(&config)]);
        let second = run(&["component", "render", "-c", path_arg(&config)]);

        assert_eq!(first.stdout, second.stdout);
    }

    #[test]
    fn test_render_refuses_invalid_config() {
        let dir = TempDir::new().unwrap();
        let config = write_config(&dir, "components:\n  cluster-autoscaler:\n");

        let output = run(&["component", "render", "-c", path_arg(&config)]);

        assert_eq!(output.status.code(), Some(2));
        assert!(output.stdout.is_empty());
        assert!(stderr(&output).contains("component requires configuration"));
    }

    #[test]
    fn test_render_autoscaler_without_token() {
        let dir = TempDir::new().unwrap();
        let config = write_config(
            &dir,
            r#"
components:
  cluster-autoscaler:
    cluster_name: demo
    worker_pool: pool-1
    packet:
      project_id: p1
      facility: ams1
"#,
        );

        let output = run(&["component", "render", "-c", path_arg(&config)]);

        assert_eq!(output.status.code(), Some(3));
        assert!(stderr(&output).contains("PACKET_AUTH_TOKEN"));
    }

    #[test]
    fn test_render_autoscaler_against_inventory() {
        let mut server = mockito::Server::new();
        let devices = server
            .mock("GET", "/projects/p1/devices")
            .match_header("x-auth-token", "secret")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"devices": [
                    {"hostname": "demo-controller-0", "facility": {"code": "ams1"}, "userdata": "controller"},
                    {"hostname": "demo-pool-1-worker-0", "facility": {"code": "ams1"}, "userdata": "worker"}
                ], "meta": {"next": null}}"#,
            )
            .expect(1)
            .create();

        let dir = TempDir::new().unwrap();
        let config = write_config(
            &dir,
            r#"
components:
  cluster-autoscaler:
    cluster_name: demo
    worker_pool: pool-1
    max_workers: 3
    packet:
      project_id: p1
      facility: ams1
"#,
        );

        let output = lokoctl()
            .args(["component", "render", "-c", path_arg(&config)])
            .env("PACKET_API_URL", server.url())
            .env("PACKET_AUTH_TOKEN", "secret")
            .output()
            .unwrap();

        devices.assert();
        assert!(output.status.success(), "{}", stderr(&output));
        let stdout = stdout(&output);
        assert!(stdout.contains("- --nodes=1:3:pool-1"));
        assert!(stdout.contains("namespace: kube-system"));
    }
}

mod dns_command {
    use super::*;

    const OUTPUTS: &str = r#"{
  "dns_entries": {
    "sensitive": false,
    "type": ["list", ["object", {}]],
    "value": [
      {"name": "api.demo.example.com", "ttl": 300, "type": "A", "records": ["192.0.2.10"]}
    ]
  }
}"#;

    fn write_outputs(dir: &TempDir) -> PathBuf {
        let path = dir.path().join("outputs.json");
        std::fs::write(&path, OUTPUTS).unwrap();
        path
    }

    #[test]
    fn test_verify_skip() {
        let dir = TempDir::new().unwrap();
        let outputs = write_outputs(&dir);

        let mut child = lokoctl()
            .args([
                "dns",
                "verify",
                "--zone",
                "example.com",
                "--outputs-file",
                path_arg(&outputs),
            ])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .unwrap();
        child
            .stdin
            .take()
            .unwrap()
            .write_all(b"maybe\nskip\n")
            .unwrap();
        let output = child.wait_with_output().unwrap();

        assert!(output.status.success(), "{}", stderr(&output));
        let stdout = stdout(&output);
        assert!(stdout.contains("api.demo.example.com"));
        assert!(stdout.contains("192.0.2.10"));
        assert!(stdout.contains("Skipped checking the DNS entries"));
    }

    #[test]
    fn test_verify_closed_input() {
        let dir = TempDir::new().unwrap();
        let outputs = write_outputs(&dir);

        let output = run(&[
            "dns",
            "verify",
            "--zone",
            "example.com",
            "--outputs-file",
            path_arg(&outputs),
        ]);

        assert_eq!(output.status.code(), Some(1));
        assert!(stderr(&output).contains("operator input closed"));
    }

    #[test]
    fn test_verify_managed_provider() {
        let output = run(&["dns", "verify", "--zone", "example.com", "--provider", "route53"]);

        assert!(output.status.success());
        assert!(stdout(&output).contains("managed by route53"));
    }

    #[test]
    fn test_verify_invalid_provider() {
        let output = run(&["dns", "verify", "--zone", "example.com", "--provider", "bind"]);

        assert_eq!(output.status.code(), Some(2));
        assert!(stderr(&output).contains("invalid DNS provider"));
    }

    #[test]
    fn test_verify_missing_outputs_file() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("outputs.json");

        let output = run(&[
            "dns",
            "verify",
            "--zone",
            "example.com",
            "--outputs-file",
            path_arg(&missing),
        ]);

        assert_eq!(output.status.code(), Some(1));
        assert!(stderr(&output).contains("failed to get DNS entries"));
    }
}
