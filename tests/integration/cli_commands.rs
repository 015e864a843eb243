#![allow(missing_docs)]

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use serde_json::Value;
use tempfile::TempDir;

const TABLE: &str = "\
id,title,redirect,links
1,Finland,false,2|3|50
2,Helsinki,false,4
3,Sauna,false,
4,Baltic Sea,false,1|99
5,Finnish language,false,1
6,Suomi,true,1
7,Orphan,false,
";

fn setup_graph(name: &str) -> (TempDir, PathBuf) {
    let dir = TempDir::new().expect("tempdir");
    let table = dir.path().join("pages.csv");
    let graph = dir.path().join(format!("{name}.wikiroute"));
    fs::write(&table, TABLE).expect("write table");
    wikiroute_cmd(&dir)
        .arg("import")
        .arg(&table)
        .arg(&graph)
        .assert()
        .success();
    (dir, graph)
}

fn wikiroute_cmd(dir: &TempDir) -> Command {
    let mut cmd = cargo_bin_cmd!("wikiroute");
    cmd.env("WIKIROUTE_CONFIG", dir.path().join("absent.toml"))
        .env_remove("RUST_LOG");
    cmd
}

fn json_stdout(cmd: &mut Command) -> Value {
    let output = cmd.assert().success().get_output().stdout.clone();
    serde_json::from_slice(&output).expect("valid json")
}

fn graph_arg(path: &Path) -> [String; 2] {
    ["--graph".to_string(), path.display().to_string()]
}

#[test]
fn import_reports_counts() {
    let dir = TempDir::new().unwrap();
    let table = dir.path().join("pages.csv");
    let graph = dir.path().join("fi.wikiroute");
    fs::write(&table, TABLE).unwrap();
    let json = json_stdout(
        wikiroute_cmd(&dir)
            .args(["--format", "json", "import"])
            .arg(&table)
            .arg(&graph),
    );
    assert_eq!(json["pages"], 7);
    assert_eq!(json["redirects"], 1);
    assert_eq!(json["links"], 3 + 1 + 2 + 1 + 1);
    assert!(graph.exists());
}

#[test]
fn route_emits_json_path() {
    let (dir, graph) = setup_graph("route");
    let json = json_stdout(
        wikiroute_cmd(&dir)
            .args(graph_arg(&graph))
            .args(["--format", "json", "route", "Helsinki", "Sauna"]),
    );
    let titles: Vec<&str> = json["pages"]
        .as_array()
        .expect("pages array")
        .iter()
        .filter_map(|hop| hop["title"].as_str())
        .collect();
    assert_eq!(titles, ["Helsinki", "Baltic Sea", "Finland", "Sauna"]);
    assert!(json["elapsed_us"].is_number());
}

#[test]
fn route_text_quotes_titles() {
    let (dir, graph) = setup_graph("route-text");
    let output = wikiroute_cmd(&dir)
        .args(graph_arg(&graph))
        .args(["route", "Suomi", "Sauna", "--unidirectional"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let text = String::from_utf8(output).unwrap();
    assert!(text.starts_with("\"Suomi\" -> \"Finland\" -> \"Sauna\"\n"));
    assert!(text.contains("2 hops"));
}

#[test]
fn missing_route_exits_with_two() {
    let (dir, graph) = setup_graph("no-route");
    let output = wikiroute_cmd(&dir)
        .args(graph_arg(&graph))
        .args(["route", "Sauna", "Orphan"])
        .assert()
        .code(2)
        .get_output()
        .stderr
        .clone();
    assert!(String::from_utf8_lossy(&output).contains("no route found"));
}

#[test]
fn missing_endpoint_is_an_error() {
    let (dir, graph) = setup_graph("no-endpoint");
    let output = wikiroute_cmd(&dir)
        .args(graph_arg(&graph))
        .args(["route", "Atlantis", "Sauna"])
        .assert()
        .code(1)
        .get_output()
        .stderr
        .clone();
    let stderr = String::from_utf8_lossy(&output);
    assert!(stderr.contains("starting point \"Atlantis\" does not exist"));
}

#[test]
fn prefix_honours_max() {
    let (dir, graph) = setup_graph("prefix");
    let json = json_stdout(
        wikiroute_cmd(&dir)
            .args(graph_arg(&graph))
            .args(["--format", "json", "prefix", "Fin", "--max", "1"]),
    );
    assert_eq!(json["titles"], serde_json::json!(["Finland"]));
}

#[test]
fn random_picks_existing_titles() {
    let (dir, graph) = setup_graph("random");
    let json = json_stdout(
        wikiroute_cmd(&dir)
            .args(graph_arg(&graph))
            .args(["--format", "json", "random", "--count", "3"]),
    );
    let titles = json["titles"].as_array().unwrap();
    assert_eq!(titles.len(), 3);
    for title in titles {
        assert!(TABLE.contains(title.as_str().unwrap()));
    }
}

#[test]
fn stats_emits_json() {
    let (dir, graph) = setup_graph("stats");
    let json = json_stdout(
        wikiroute_cmd(&dir)
            .args(graph_arg(&graph))
            .args(["--format", "json", "stats"]),
    );
    assert_eq!(json["pages"], 7);
    assert_eq!(json["redirects"], 1);
    assert_eq!(json["forward_blocks"], 7);
    assert!(json["reverse_entries"].is_number());
    assert_eq!(json["largest_id"], 7);
    assert_eq!(json["max_links"], 3);
    assert_eq!(json["title_bytes"], 57);
    assert_eq!(json["longest_title"], "Finnish language".len());
}

#[test]
fn stats_text_reports_title_sizes() {
    let (dir, graph) = setup_graph("stats-text");
    let output = wikiroute_cmd(&dir)
        .args(graph_arg(&graph))
        .arg("stats")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let text = String::from_utf8(output).unwrap();
    assert!(text.contains("Largest id: 7\n"));
    assert!(text.contains("Most links on one page: 3\n"));
    assert!(text.contains("Titles: 57 bytes in total, longest 16 bytes\n"));
}

#[test]
fn links_skip_pages_that_do_not_exist() {
    let (dir, graph) = setup_graph("links");
    let json = json_stdout(
        wikiroute_cmd(&dir)
            .args(graph_arg(&graph))
            .args(["--format", "json", "links", "Finland"]),
    );
    assert_eq!(json["titles"], serde_json::json!(["Helsinki", "Sauna"]));

    let output = wikiroute_cmd(&dir)
        .args(graph_arg(&graph))
        .args(["links", "Baltic Sea"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    assert_eq!(String::from_utf8(output).unwrap(), "Finland\n");

    let output = wikiroute_cmd(&dir)
        .args(graph_arg(&graph))
        .args(["links", "Atlantis"])
        .assert()
        .code(1)
        .get_output()
        .stderr
        .clone();
    assert!(String::from_utf8(output).unwrap().contains("\"Atlantis\" does not exist"));
}

#[test]
fn random_route_joins_two_distinct_pages() {
    let (dir, graph) = setup_graph("random-route");
    for _ in 0..5 {
        let output = wikiroute_cmd(&dir)
            .args(graph_arg(&graph))
            .args(["--format", "json", "random-route"])
            .output()
            .unwrap();
        match output.status.code() {
            Some(0) => {
                let json: Value = serde_json::from_slice(&output.stdout).unwrap();
                let pages = json["pages"].as_array().expect("pages array");
                assert!(pages.len() >= 2);
                assert_ne!(pages[0]["id"], pages[pages.len() - 1]["id"]);
            }
            Some(2) => {
                let stderr = String::from_utf8(output.stderr).unwrap();
                assert!(stderr.contains("no route found"));
            }
            other => panic!("unexpected exit {other:?}"),
        }
    }
}

#[test]
fn graph_can_be_read_from_stdin() {
    let (dir, graph) = setup_graph("stdin");
    let bytes = fs::read(&graph).unwrap();
    let json = json_stdout(
        wikiroute_cmd(&dir)
            .args(["--graph", "-", "--format", "json", "route", "Helsinki", "Sauna"])
            .write_stdin(bytes.clone()),
    );
    assert_eq!(json["pages"].as_array().map(Vec::len), Some(4));

    let json = json_stdout(
        wikiroute_cmd(&dir)
            .args(["--graph", "-", "--format", "json", "stats"])
            .write_stdin(bytes),
    );
    assert_eq!(json["pages"], 7);

    wikiroute_cmd(&dir)
        .args(["--graph", "-", "stats"])
        .write_stdin(Vec::new())
        .assert()
        .code(1);
}

#[test]
fn export_round_trips_through_import() {
    let (dir, graph) = setup_graph("export");
    let table = dir.path().join("out.tsv");
    wikiroute_cmd(&dir)
        .args(graph_arg(&graph))
        .arg("export")
        .arg(&table)
        .assert()
        .success();
    let text = fs::read_to_string(&table).unwrap();
    assert!(text.starts_with("id\ttitle\tredirect\tlinks\n"));
    assert!(text.contains("6\tSuomi\ttrue\t1\n"));

    let reimported = dir.path().join("again.wikiroute");
    wikiroute_cmd(&dir)
        .arg("import")
        .arg(&table)
        .arg(&reimported)
        .assert()
        .success();
    assert_eq!(fs::read(&graph).unwrap(), fs::read(&reimported).unwrap());
}

#[test]
fn config_file_supplies_graph_and_options() {
    let (dir, graph) = setup_graph("config");
    let config = dir.path().join("cli.toml");
    fs::write(
        &config,
        format!(
            "graph = {:?}\nunidirectional = true\nwindow_bytes = 64\nprefix_max = 2\n",
            graph.display().to_string()
        ),
    )
    .unwrap();
    let json = json_stdout(
        cargo_bin_cmd!("wikiroute")
            .env("WIKIROUTE_CONFIG", &config)
            .env_remove("RUST_LOG")
            .args(["--format", "json", "prefix", "F"]),
    );
    assert_eq!(
        json["titles"],
        serde_json::json!(["Finland", "Finnish language"])
    );
    let json = json_stdout(
        cargo_bin_cmd!("wikiroute")
            .args(["--config"])
            .arg(&config)
            .args(["--format", "json", "stats"]),
    );
    assert_eq!(json["reverse_blocks"], 0);
}

#[test]
fn commands_without_graph_fail() {
    let dir = TempDir::new().unwrap();
    let output = wikiroute_cmd(&dir)
        .arg("stats")
        .assert()
        .code(1)
        .get_output()
        .stderr
        .clone();
    assert!(String::from_utf8_lossy(&output).contains("no graph given"));
}
