//! Job parser tests against a real temporary directory.

use fanout_core::job::ParseOptions;
use fanout_core::{Catalog, Flag, JobParser, LocalFs, ParseError, WorkDescriptor};
use rstest::{fixture, rstest};
use tempfile::TempDir;

struct Workspace {
    dir: TempDir,
    fs: LocalFs,
    catalog: Catalog,
}

impl Workspace {
    async fn parse(&self, tokens: &[&str]) -> Result<WorkDescriptor, ParseError> {
        JobParser::new(&self.catalog, &self.fs).parse(tokens).await
    }

    async fn parse_exact(&self, tokens: &[&str]) -> Result<WorkDescriptor, ParseError> {
        JobParser::new(&self.catalog, &self.fs)
            .with_options(ParseOptions { exact: true })
            .parse(tokens)
            .await
    }
}

#[fixture]
fn workspace() -> Workspace {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    std::fs::create_dir_all(root.join("skps/top25")).unwrap();
    for file in ["skps/desk.skp", "skps/top25/amazon.skp", "skps/.cache.skp", "mandrill.png"] {
        std::fs::write(root.join(file), b"").unwrap();
    }
    Workspace {
        fs: LocalFs::rooted(root),
        catalog: Catalog::parse("aaclip\naarectmodes\nbigmatrix\nblurrect\n"),
        dir,
    }
}

#[rstest]
#[tokio::test]
async fn catalog_names_and_flags(workspace: Workspace) {
    let work = workspace
        .parse(&["aaclip", "backend=cpu", "bigmatrix", "config=8888"])
        .await
        .unwrap();
    assert_eq!(work.sources, ["aaclip", "bigmatrix"]);
    assert_eq!(
        work.flags,
        [Flag::new("backend", "cpu"), Flag::new("config", "8888")]
    );
}

#[rstest]
#[case::gm("gm")]
#[case::gms("gms")]
#[tokio::test]
async fn shortcut_selects_whole_catalog(workspace: Workspace, #[case] token: &str) {
    let work = workspace.parse(&[token]).await.unwrap();
    assert_eq!(work.sources, workspace.catalog.names());
}

#[rstest]
#[tokio::test]
async fn substring_and_exact_matching(workspace: Workspace) {
    let loose = workspace.parse(&["rect"]).await.unwrap();
    assert_eq!(loose.sources, ["aarectmodes", "blurrect"]);

    let err = workspace.parse_exact(&["rect"]).await.unwrap_err();
    assert_eq!(err.to_string(), "don't understand `rect`");

    let exact = workspace.parse_exact(&["blurrect"]).await.unwrap();
    assert_eq!(exact.sources, ["blurrect"]);
}

#[rstest]
#[tokio::test]
async fn comment_ends_the_job(workspace: Workspace) {
    let work = workspace
        .parse(&["aaclip", "#", "bigmatrix", "--ignored", "nonsense"])
        .await
        .unwrap();
    assert_eq!(work.sources, ["aaclip"]);

    let work = workspace.parse(&["#aaclip"]).await.unwrap();
    assert!(work.is_empty());
}

#[rstest]
#[tokio::test]
async fn empty_tokens_are_skipped(workspace: Workspace) {
    let work = workspace.parse(&["", "aaclip", ""]).await.unwrap();
    assert_eq!(work.sources, ["aaclip"]);
}

#[rstest]
#[tokio::test]
async fn directories_expand_to_all_files(workspace: Workspace) {
    let work = workspace.parse(&["skps"]).await.unwrap();
    assert_eq!(
        work.sources,
        ["skps/.cache.skp", "skps/desk.skp", "skps/top25/amazon.skp"]
    );
}

#[rstest]
#[tokio::test]
async fn globs_expand(workspace: Workspace) {
    let work = workspace.parse(&["*.png", "skps/*.skp"]).await.unwrap();
    assert_eq!(work.sources, ["mandrill.png", "skps/.cache.skp", "skps/desk.skp"]);
}

#[rstest]
#[tokio::test]
async fn catalog_wins_over_filesystem(workspace: Workspace) {
    std::fs::write(workspace.dir.path().join("aaclip"), b"").unwrap();
    let work = workspace.parse(&["aaclip"]).await.unwrap();
    assert_eq!(work.sources, ["aaclip"]);
}

#[rstest]
#[tokio::test]
async fn unmatched_glob_names_the_token(workspace: Workspace) {
    let err = workspace
        .parse(&["aaclip", "no_such_file_or_gm_*.xyz"])
        .await
        .unwrap_err();
    assert!(matches!(err, ParseError::Unrecognized { ref token } if token == "no_such_file_or_gm_*.xyz"));
    assert!(err.to_string().contains("no_such_file_or_gm_*.xyz"));
}

#[rstest]
#[case::short_dispatcher("-q")]
#[case::long_dispatcher("--cpuLimit=4")]
#[case::random("--random=false")]
#[tokio::test]
async fn dispatcher_options_are_rejected(workspace: Workspace, #[case] token: &str) {
    let err = workspace.parse(&["aaclip", token]).await.unwrap_err();
    assert!(matches!(err, ParseError::DispatcherOption { .. }), "{err}");
}

#[rstest]
#[case::long("--backend", "backend=<value>")]
#[case::long_with_value("--config=8888", "config=8888")]
#[case::short("-w", "w=<value>")]
#[tokio::test]
async fn worker_options_point_at_key_value(
    workspace: Workspace,
    #[case] token: &str,
    #[case] expected: &str,
) {
    let err = workspace.parse(&[token]).await.unwrap_err();
    let ParseError::WorkerOption { suggestion, .. } = err else {
        panic!("expected a worker option error");
    };
    assert_eq!(suggestion, expected);
}

#[rstest]
#[tokio::test]
async fn malformed_key_value_is_not_a_flag(workspace: Workspace) {
    let err = workspace.parse(&["a=b=c"]).await.unwrap_err();
    assert!(matches!(err, ParseError::Unrecognized { .. }));
}

#[rstest]
#[tokio::test]
async fn parsing_is_repeatable(workspace: Workspace) {
    let tokens = ["gm", "skps", "*.png", "backend=gl"];
    let first = workspace.parse(&tokens).await.unwrap();
    let second = workspace.parse(&tokens).await.unwrap();
    assert_eq!(first, second);
}
