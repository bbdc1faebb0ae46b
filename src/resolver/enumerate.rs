//! Per-package file enumeration.

use std::path::PathBuf;

use crate::core::PackageDescriptor;
use crate::resolver::embed::expand_embeds;

/// Emit every file a package contributes to the build: all source and
/// companion files, the expansion of its embed patterns, and (when
/// `include_tests` is set) test sources and test embeds. Filenames are
/// joined with the package directory, so the sink always receives
/// absolute paths.
///
/// Embed-expansion failures are returned for the caller to aggregate;
/// they do not stop the remaining enumeration.
pub fn enumerate_package(
    pkg: &PackageDescriptor,
    include_tests: bool,
    sink: &mut dyn FnMut(PathBuf),
) -> Vec<anyhow::Error> {
    let mut add_name = |name: &String| sink(pkg.dir.join(name));

    for bucket in [
        &pkg.go_files,
        &pkg.cgo_files,
        &pkg.ignored_go_files,
        &pkg.invalid_go_files,
        &pkg.c_files,
        &pkg.cxx_files,
        &pkg.m_files,
        &pkg.h_files,
        &pkg.f_files,
        &pkg.s_files,
        &pkg.swig_files,
        &pkg.swig_cxx_files,
        &pkg.syso_files,
    ] {
        bucket.iter().for_each(&mut add_name);
    }
    if include_tests {
        pkg.test_go_files.iter().for_each(&mut add_name);
        pkg.xtest_go_files.iter().for_each(&mut add_name);
    }

    let mut add_embed = |rel: PathBuf| sink(pkg.dir.join(rel));
    let mut errors = expand_embeds(&pkg.dir, &pkg.embed_patterns, &mut add_embed);
    if include_tests {
        errors.extend(expand_embeds(
            &pkg.dir,
            &pkg.test_embed_patterns,
            &mut add_embed,
        ));
        errors.extend(expand_embeds(
            &pkg.dir,
            &pkg.xtest_embed_patterns,
            &mut add_embed,
        ));
    }
    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use tempfile::TempDir;

    #[test]
    fn test_enumerate_buckets_and_embeds() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("data.txt"), "x").unwrap();

        let pkg = PackageDescriptor {
            dir: tmp.path().to_path_buf(),
            go_files: vec!["main.go".into()],
            c_files: vec!["impl.c".into()],
            test_go_files: vec!["main_test.go".into()],
            embed_patterns: vec!["data.txt".into()],
            ..Default::default()
        };

        let collect = |include_tests: bool| {
            let mut files = Vec::new();
            let errors = enumerate_package(&pkg, include_tests, &mut |p| files.push(p));
            assert!(errors.is_empty());
            files.sort();
            files
        };

        let rel = |name: &str| tmp.path().join(name);
        assert_eq!(
            collect(false),
            vec![rel("data.txt"), rel("impl.c"), rel("main.go")]
        );
        assert_eq!(
            collect(true),
            vec![
                rel("data.txt"),
                rel("impl.c"),
                rel("main.go"),
                rel("main_test.go")
            ]
        );
    }

    #[test]
    fn test_paths_are_absolute() {
        let tmp = TempDir::new().unwrap();
        let pkg = PackageDescriptor {
            dir: tmp.path().to_path_buf(),
            go_files: vec!["main.go".into()],
            ..Default::default()
        };

        let mut files = Vec::new();
        enumerate_package(&pkg, false, &mut |p| files.push(p));
        assert!(files.iter().all(|p| Path::is_absolute(p)));
    }
}
