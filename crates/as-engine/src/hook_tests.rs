use super::*;

#[test]
fn splits_on_whitespace() {
    assert_eq!(shell_split("echo hello world"), vec!["echo", "hello", "world"]);
}

#[test]
fn quoted_segments_become_one_token() {
    assert_eq!(shell_split(r#"echo "hello world" 'foo bar'"#), vec!["echo", "hello world", "foo bar"]);
}

#[test]
fn collapses_repeated_whitespace() {
    assert_eq!(shell_split("echo   a\tb"), vec!["echo", "a", "b"]);
}

#[test]
fn substitutes_known_variables() {
    let mut vars = HashMap::new();
    vars.insert("run_id".to_string(), "run-abc".to_string());
    assert_eq!(substitute("--run=$run_id", &vars), "--run=run-abc");
}

#[test]
fn leaves_unknown_variables_untouched() {
    let vars = HashMap::new();
    assert_eq!(substitute("--run=$run_id", &vars), "--run=$run_id");
}

#[test]
fn dollar_without_identifier_is_literal() {
    let vars = HashMap::new();
    assert_eq!(substitute("price: $5", &vars), "price: $5");
}

#[test]
fn new_rejects_empty_template() {
    assert!(PostRunHook::new("   ").is_none());
}

#[tokio::test]
async fn run_executes_substituted_argv_without_panicking() {
    let hook = PostRunHook::new("true").unwrap();
    hook.run(&HashMap::new()).await;
}

#[tokio::test]
async fn run_exports_vars_as_env_for_the_child() {
    let dir = tempfile::tempdir().unwrap();
    let out_path = dir.path().join("out.txt");
    let hook = PostRunHook::new(&format!(
        "sh -c \"printenv ACTION_SERVER_HOOK_RUN_ID > {}\"",
        out_path.display()
    ))
    .unwrap();
    let mut vars = HashMap::new();
    vars.insert("run_id".to_string(), "run-xyz".to_string());
    hook.run(&vars).await;
    let written = std::fs::read_to_string(&out_path).unwrap_or_default();
    assert_eq!(written.trim(), "run-xyz");
}
