use anyhow::Result;
use ffind::{run_to, Dialect, FindError, SearchConfig, TypeFilter};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

/// Builds `width` directories per level, `depth` levels deep, with a few files
/// in every directory
fn create_test_tree(root: &Path, width: usize, depth: usize) -> Result<()> {
    if depth == 0 {
        return Ok(());
    }
    for i in 0..width {
        let dir = root.join(format!("dir_{}", i));
        fs::create_dir(&dir)?;
        fs::write(dir.join("notes.txt"), "")?;
        fs::write(dir.join(format!("module_{}.rs", i)), "")?;
        fs::write(dir.join("Makefile"), "")?;
        create_test_tree(&dir, width, depth - 1)?;
    }
    Ok(())
}

/// Every path below `dir`, found without ffind
fn reference_walk(dir: &Path, out: &mut BTreeSet<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        out.insert(path.clone());
        if entry.file_type()?.is_dir() {
            reference_walk(&path, out)?;
        }
    }
    Ok(())
}

fn found(output: &[u8]) -> BTreeSet<PathBuf> {
    String::from_utf8_lossy(output)
        .lines()
        .map(PathBuf::from)
        .collect()
}

fn config_for(root: &Path) -> SearchConfig {
    SearchConfig {
        roots: vec![root.to_path_buf()],
        ..SearchConfig::default()
    }
}

#[test]
fn test_complete_walk_matches_reference() -> Result<()> {
    let dir = tempdir()?;
    create_test_tree(dir.path(), 4, 3)?;

    let mut expected = BTreeSet::new();
    reference_walk(dir.path(), &mut expected)?;

    for threads in [1, 2, 4, 16] {
        let config = SearchConfig {
            thread_count: threads,
            ..config_for(dir.path())
        };
        let (summary, output) = run_to(&config, Vec::new())?;

        let lines = String::from_utf8(output.clone())?.lines().count();
        assert_eq!(lines, expected.len(), "{} threads printed duplicates", threads);
        assert_eq!(found(&output), expected);
        assert_eq!(summary.matches, expected.len() as u64);
        assert!(summary.is_clean());
    }
    Ok(())
}

#[test]
fn test_dialects_agree() -> Result<()> {
    let dir = tempdir()?;
    create_test_tree(dir.path(), 3, 3)?;

    let run = |pattern: &str, dialect: Dialect| -> Result<BTreeSet<PathBuf>> {
        let config = SearchConfig {
            pattern: Some(pattern.to_string()),
            dialect,
            entry_type: TypeFilter::File,
            ..config_for(dir.path())
        };
        let (_, output) = run_to(&config, Vec::new())?;
        Ok(found(&output))
    };

    let glob = run("*/module_*.rs", Dialect::Glob)?;
    assert_eq!(glob.len(), 3 + 9 + 27);
    assert_eq!(run(r"/module_[0-9]*\.rs$", Dialect::PosixBasic)?, glob);
    assert_eq!(run(r"/module_[0-9]+\.rs$", Dialect::PosixExtended)?, glob);
    assert_eq!(run(r"/module_\d+\.rs$", Dialect::Pcre)?, glob);
    assert_eq!(run(r"/module_\d+\.rs$", Dialect::JavaScript)?, glob);
    assert_eq!(run(".rs", Dialect::Literal)?, glob);
    Ok(())
}

#[test]
fn test_case_insensitive_search() -> Result<()> {
    let dir = tempdir()?;
    create_test_tree(dir.path(), 2, 2)?;

    let config = SearchConfig {
        pattern: Some("*/makefile".to_string()),
        case_insensitive: true,
        ..config_for(dir.path())
    };
    let (summary, _) = run_to(&config, Vec::new())?;
    assert_eq!(summary.matches, 2 + 4);
    Ok(())
}

#[test]
fn test_print0_output() -> Result<()> {
    let dir = tempdir()?;
    fs::write(dir.path().join("with\nnewline"), "")?;

    let config = SearchConfig {
        print0: true,
        ..config_for(dir.path())
    };
    let (_, output) = run_to(&config, Vec::new())?;

    let expected = format!("{}/with\nnewline\0", dir.path().display());
    assert_eq!(output, expected.into_bytes());
    Ok(())
}

#[test]
fn test_max_depth() -> Result<()> {
    let dir = tempdir()?;
    create_test_tree(dir.path(), 2, 4)?;

    let depth_of = |path: &Path| path.strip_prefix(dir.path()).unwrap().components().count();

    for max_depth in [0i64, 1, 2] {
        let config = SearchConfig {
            max_depth,
            ..config_for(dir.path())
        };
        let (_, output) = run_to(&config, Vec::new())?;
        let deepest = found(&output).iter().map(|p| depth_of(p)).max().unwrap();
        // The root's children are depth 1 and each unit of budget adds a level
        assert_eq!(deepest as i64, max_depth + 1);
    }
    Ok(())
}

#[test]
fn test_compile_error_stops_before_walking() {
    let config = SearchConfig {
        pattern: Some("[unterminated".to_string()),
        dialect: Dialect::PosixExtended,
        ..SearchConfig::default()
    };
    let result = run_to(&config, Vec::new());
    assert!(matches!(
        result,
        Err(FindError::PatternCompile {
            offset: Some(0),
            ..
        })
    ));
}

#[cfg(unix)]
#[test]
fn test_symlink_loop_terminates() -> Result<()> {
    let dir = tempdir()?;
    fs::create_dir(dir.path().join("a"))?;
    std::os::unix::fs::symlink(dir.path(), dir.path().join("a/back"))?;

    // Without following, the link is just an entry
    let (summary, _) = run_to(&config_for(dir.path()), Vec::new())?;
    assert_eq!(summary.matches, 2);
    assert!(summary.is_clean());

    // Following it eventually fails to resolve, which ends the descent
    let config = SearchConfig {
        follow_symlinks: true,
        ..config_for(dir.path())
    };
    let (summary, _) = run_to(&config, Vec::new())?;
    assert!(summary.matches > 2);
    Ok(())
}
