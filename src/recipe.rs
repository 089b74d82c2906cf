//! Singularity definition document assembly.
//!
//! Builds the five-section recipe consumed by `singularity build`:
//!
//! ```text
//! Bootstrap/BootStrap + From   base layer
//! %post                        OS packages, EasyBuild upgrade, eb invocation
//! %runscript                   argument pass-through
//! %environment                 module path + module load lines
//! %labels                      reserved, empty
//! ```
//!
//! Everything here is a deterministic function of its inputs. No I/O happens
//! until [`DefinitionDocument::write_to`].

use std::fs;
use std::path::{Path, PathBuf};

use crate::bootstrap::Bootstrap;
use crate::buildspec::{BuildRequest, BuildSpec};
use crate::config::ModuleScheme;
use crate::error::{Result, SindefError};
use crate::repo::RepoRef;

/// Install tree and scratch locations inside the container.
const INSTALL_PATH: &str = "/app/";
const SCRATCH_PREFIX: &str = "/scratch";
const SCRATCH_TMPDIR: &str = "/scratch/tmp";

/// Where the in-container clones land (the build runs as user `easybuild`).
const EASYCONFIGS_CLONE_DIR: &str = "easybuild-easyconfigs";
const EASYBLOCKS_CLONE_DIR: &str = "easybuild-easyblocks";

/// A finished definition document: content plus its computed file name
/// (`Singularity.<name>-<version>[-<toolchain>-<tcver>]<versionsuffix>`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefinitionDocument {
    file_name: String,
    content: String,
}

impl DefinitionDocument {
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    /// Write the document into `dir`, which must be an existing directory.
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf> {
        if !dir.is_dir() {
            return Err(SindefError::InvalidTargetDirectory {
                path: dir.to_path_buf(),
            });
        }
        let path = dir.join(&self.file_name);
        fs::write(&path, &self.content)?;
        Ok(path)
    }
}

/// Assemble the definition document for a build request.
///
/// Section order is fixed: bootstrap, post, runscript, environment, labels.
/// Only the first spec of the request is consulted.
pub fn build(
    bootstrap: &Bootstrap,
    request: &BuildRequest,
    scheme: ModuleScheme,
    ec_repo: Option<&RepoRef>,
    eb_repo: Option<&RepoRef>,
) -> DefinitionDocument {
    let spec = request.first();
    let build_file = format!("{}.eb", build_file_stem(spec));

    let mut content = bootstrap_section(bootstrap);
    content.push_str(&post_section(spec, scheme, ec_repo, eb_repo, &build_file));
    content.push_str("\n%runscript\neval \"$@\"\n");
    content.push_str(&environment_section(spec, scheme));
    content.push_str("\n%labels\n");

    DefinitionDocument {
        file_name: format!("Singularity.{}", build_file_stem(spec)),
        content,
    }
}

/// Stem shared by the easyconfig file name and the definition file name.
///
/// With the no-toolchain sentinel the toolchain is left out entirely
/// (`bzip2-1.0.6`); otherwise it is part of the name
/// (`R-3.3.1-intel-2017a`). The version suffix, when present, already starts
/// with its own separator.
fn build_file_stem(spec: &BuildSpec) -> String {
    if spec.toolchain.is_system() {
        format!("{}-{}{}", spec.name, spec.version, spec.versionsuffix)
    } else {
        format!(
            "{}-{}-{}-{}{}",
            spec.name, spec.version, spec.toolchain.name, spec.toolchain.version, spec.versionsuffix
        )
    }
}

/// `module load` lines for the environment section.
///
/// Hierarchical naming needs the toolchain module loaded before the package
/// module; the flat scheme folds the toolchain into a single module name. With
/// the no-toolchain sentinel both schemes load the same single module.
fn module_load_lines(spec: &BuildSpec, scheme: ModuleScheme) -> Vec<String> {
    let tc = &spec.toolchain;
    if tc.is_system() {
        return vec![format!(
            "module load {}/{}{}",
            spec.name, spec.version, spec.versionsuffix
        )];
    }
    match scheme {
        ModuleScheme::Hierarchical => vec![
            format!("module load {}/{}", tc.name, tc.version),
            format!(
                "module load {}/{}{}",
                spec.name, spec.version, spec.versionsuffix
            ),
        ],
        ModuleScheme::Easybuild => vec![format!(
            "module load {}/{}-{}-{}{}",
            spec.name, spec.version, tc.name, tc.version, spec.versionsuffix
        )],
    }
}

fn bootstrap_section(bootstrap: &Bootstrap) -> String {
    match bootstrap {
        Bootstrap::LocalImage { path } => {
            format!("Bootstrap: localimage\nFrom: {}\n", path.display())
        }
        // The remote agents historically spell the keyword with a capital S.
        Bootstrap::Shub { image, tag } => remote_bootstrap("shub", image, tag.as_deref()),
        Bootstrap::Docker { image, tag } => remote_bootstrap("docker", image, tag.as_deref()),
    }
}

fn remote_bootstrap(agent: &str, image: &str, tag: Option<&str>) -> String {
    match tag {
        Some(tag) => format!("BootStrap: {agent}\nFrom: {image}:{tag}\n"),
        None => format!("BootStrap: {agent}\nFrom: {image}\n"),
    }
}

fn post_section(
    spec: &BuildSpec,
    scheme: ModuleScheme,
    ec_repo: Option<&RepoRef>,
    eb_repo: Option<&RepoRef>,
    build_file: &str,
) -> String {
    let mut section = String::from("\n%post\n");

    // OS packages are best-effort: a missing optional package must not abort
    // the containerized build.
    for package in spec.osdependencies.flatten() {
        section.push_str(&format!("yum install -y {package} || true\n"));
    }

    section.push_str("pip install -U easybuild\n");
    section.push_str("su - easybuild\n");

    if let Some(repo) = ec_repo {
        section.push_str(&format!("git clone -b {} {}\n", repo.branch, repo.url));
        section.push_str(&format!(
            "export EASYBUILD_ROBOT_PATHS=/home/easybuild/{EASYCONFIGS_CLONE_DIR}/easybuild/easyconfigs\n"
        ));
    }

    if let Some(repo) = eb_repo {
        section.push_str(&format!("git clone -b {} {}\n", repo.branch, repo.url));
        section.push_str(&format!(
            "export EASYBUILD_INCLUDE_EASYBLOCKS=/home/easybuild/{EASYBLOCKS_CLONE_DIR}/easybuild/easyblocks/{}\n",
            repo.file.as_deref().unwrap_or_default()
        ));
    }

    section.push_str(&format!(
        "eb {build_file} --robot --installpath={INSTALL_PATH} --prefix={SCRATCH_PREFIX} \
         --tmpdir={SCRATCH_TMPDIR} --module-naming-scheme={}\n",
        scheme.flag()
    ));

    if ec_repo.is_some() {
        section.push_str(&format!("rm -rf {EASYCONFIGS_CLONE_DIR}\n"));
    }
    if eb_repo.is_some() {
        section.push_str(&format!("rm -rf {EASYBLOCKS_CLONE_DIR}\n"));
    }

    section.push_str(
        "exit\n\
         rm -rf /scratch/tmp/*\n\
         rm -rf /scratch/build\n\
         rm -rf /scratch/sources\n\
         rm -rf /scratch/ebfiles_repo\n",
    );

    section
}

fn environment_section(spec: &BuildSpec, scheme: ModuleScheme) -> String {
    let mut section = String::from("\n%environment\nsource /etc/profile\n");
    section.push_str(&format!("module use {}\n", scheme.module_path()));
    for line in module_load_lines(spec, scheme) {
        section.push_str(&line);
        section.push('\n');
    }
    section
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buildspec::{OsDependencies, Toolchain};

    fn spec(name: &str, version: &str, suffix: &str, tc: (&str, &str)) -> BuildSpec {
        BuildSpec {
            name: name.to_string(),
            version: version.to_string(),
            versionsuffix: suffix.to_string(),
            toolchain: Toolchain {
                name: tc.0.to_string(),
                version: tc.1.to_string(),
            },
            osdependencies: OsDependencies::default(),
        }
    }

    fn request(spec: BuildSpec) -> BuildRequest {
        BuildRequest::new(vec![spec]).unwrap()
    }

    fn docker_ubuntu() -> Bootstrap {
        Bootstrap::parse("docker:ubuntu:18.04").unwrap()
    }

    #[test]
    fn test_bzip2_flat_scheme_end_to_end() {
        let document = build(
            &docker_ubuntu(),
            &request(spec("bzip2", "1.0.6", "", ("dummy", "dummy"))),
            ModuleScheme::Easybuild,
            None,
            None,
        );

        assert_eq!(document.file_name(), "Singularity.bzip2-1.0.6");
        let content = document.content();
        assert!(content.starts_with("BootStrap: docker\nFrom: ubuntu:18.04\n"));
        assert!(content.contains("module use /app/modules/all/\n"));
        assert!(content.contains("module load bzip2/1.0.6\n"));
        // No-toolchain sentinel: easyconfig name has no toolchain part.
        assert!(content.contains("eb bzip2-1.0.6.eb --robot"));
    }

    #[test]
    fn test_intel_hierarchical_loads_toolchain_then_package() {
        let document = build(
            &docker_ubuntu(),
            &request(spec("bzip2", "1.0.6", "", ("intel", "2017a"))),
            ModuleScheme::Hierarchical,
            None,
            None,
        );

        assert_eq!(document.file_name(), "Singularity.bzip2-1.0.6-intel-2017a");
        let content = document.content();
        assert!(content.contains("module use /app/modules/all/Core\n"));
        let toolchain_load = content.find("module load intel/2017a\n").unwrap();
        let package_load = content.find("module load bzip2/1.0.6\n").unwrap();
        assert!(toolchain_load < package_load);
        assert!(content.contains("--module-naming-scheme=HierarchicalMNS"));
    }

    #[test]
    fn test_toolchain_flat_scheme_single_combined_module() {
        let document = build(
            &docker_ubuntu(),
            &request(spec("R", "3.3.1", "", ("intel", "2017a"))),
            ModuleScheme::Easybuild,
            None,
            None,
        );

        let content = document.content();
        assert!(content.contains("module load R/3.3.1-intel-2017a\n"));
        assert!(!content.contains("module load intel/2017a\n"));
        assert!(content.contains("eb R-3.3.1-intel-2017a.eb --robot"));
    }

    #[test]
    fn test_version_suffix_carried_through() {
        let document = build(
            &docker_ubuntu(),
            &request(spec("h5py", "2.7.1", "-Python-2.7.14", ("intel", "2017a"))),
            ModuleScheme::Easybuild,
            None,
            None,
        );

        assert_eq!(
            document.file_name(),
            "Singularity.h5py-2.7.1-intel-2017a-Python-2.7.14"
        );
        assert!(document
            .content()
            .contains("module load h5py/2.7.1-intel-2017a-Python-2.7.14\n"));
    }

    #[test]
    fn test_localimage_bootstrap_section() {
        let bootstrap = Bootstrap::LocalImage {
            path: PathBuf::from("/images/base.simg"),
        };
        let document = build(
            &bootstrap,
            &request(spec("bzip2", "1.0.6", "", ("dummy", "dummy"))),
            ModuleScheme::Easybuild,
            None,
            None,
        );
        assert!(document
            .content()
            .starts_with("Bootstrap: localimage\nFrom: /images/base.simg\n"));
    }

    #[test]
    fn test_untagged_remote_omits_tag_segment() {
        let bootstrap = Bootstrap::parse("docker:centos").unwrap();
        let document = build(
            &bootstrap,
            &request(spec("bzip2", "1.0.6", "", ("dummy", "dummy"))),
            ModuleScheme::Easybuild,
            None,
            None,
        );
        assert!(document.content().starts_with("BootStrap: docker\nFrom: centos\n"));
    }

    #[test]
    fn test_section_order_is_fixed() {
        let document = build(
            &docker_ubuntu(),
            &request(spec("bzip2", "1.0.6", "", ("dummy", "dummy"))),
            ModuleScheme::Easybuild,
            None,
            None,
        );
        let content = document.content();
        let post = content.find("\n%post\n").unwrap();
        let runscript = content.find("\n%runscript\n").unwrap();
        let environment = content.find("\n%environment\n").unwrap();
        let labels = content.find("\n%labels\n").unwrap();
        assert!(post < runscript && runscript < environment && environment < labels);
    }

    #[test]
    fn test_os_dependencies_install_lines_are_best_effort() {
        let mut s = spec("OpenMPI", "2.1.1", "", ("GCC", "6.4.0"));
        s.osdependencies =
            OsDependencies::Flat(vec!["libibverbs-dev".to_string(), "rdma-core-devel".to_string()]);
        let document = build(
            &docker_ubuntu(),
            &request(s),
            ModuleScheme::Easybuild,
            None,
            None,
        );
        let content = document.content();
        assert!(content.contains("yum install -y libibverbs-dev || true\n"));
        assert!(content.contains("yum install -y rdma-core-devel || true\n"));
    }

    #[test]
    fn test_flat_and_wrapped_os_dependencies_render_identically() {
        let mut flat = spec("OpenMPI", "2.1.1", "", ("GCC", "6.4.0"));
        flat.osdependencies =
            OsDependencies::Flat(vec!["libibverbs-dev".to_string(), "rdma-core-devel".to_string()]);

        let mut wrapped = spec("OpenMPI", "2.1.1", "", ("GCC", "6.4.0"));
        wrapped.osdependencies = OsDependencies::Wrapped(vec![vec![
            "libibverbs-dev".to_string(),
            "rdma-core-devel".to_string(),
        ]]);

        let bootstrap = docker_ubuntu();
        let a = build(&bootstrap, &request(flat), ModuleScheme::Easybuild, None, None);
        let b = build(&bootstrap, &request(wrapped), ModuleScheme::Easybuild, None, None);
        assert_eq!(a, b);
    }

    #[test]
    fn test_repo_clone_lines_and_cleanup() {
        let ec = RepoRef {
            url: "https://github.com/easybuilders/easybuild-easyconfigs".to_string(),
            branch: "develop".to_string(),
            file: None,
        };
        let eb = RepoRef {
            url: "https://github.com/easybuilders/easybuild-easyblocks".to_string(),
            branch: "main".to_string(),
            file: Some("gromacs.py".to_string()),
        };

        let document = build(
            &docker_ubuntu(),
            &request(spec("GROMACS", "2016.4", "", ("foss", "2017b"))),
            ModuleScheme::Easybuild,
            Some(&ec),
            Some(&eb),
        );
        let content = document.content();

        assert!(content.contains(
            "git clone -b develop https://github.com/easybuilders/easybuild-easyconfigs\n"
        ));
        assert!(content.contains(
            "export EASYBUILD_ROBOT_PATHS=/home/easybuild/easybuild-easyconfigs/easybuild/easyconfigs\n"
        ));
        assert!(content.contains(
            "git clone -b main https://github.com/easybuilders/easybuild-easyblocks\n"
        ));
        assert!(content.contains(
            "export EASYBUILD_INCLUDE_EASYBLOCKS=/home/easybuild/easybuild-easyblocks/easybuild/easyblocks/gromacs.py\n"
        ));

        // Clones are removed after the eb invocation, before the fixed
        // scratch cleanup.
        let eb_line = content.find("eb GROMACS-2016.4-foss-2017b.eb").unwrap();
        let rm_ec = content.find("rm -rf easybuild-easyconfigs\n").unwrap();
        let rm_eb = content.find("rm -rf easybuild-easyblocks\n").unwrap();
        let scratch_cleanup = content.find("rm -rf /scratch/tmp/*\n").unwrap();
        assert!(eb_line < rm_ec && rm_ec < rm_eb && rm_eb < scratch_cleanup);
    }

    #[test]
    fn test_no_repos_no_clone_or_cleanup_lines() {
        let document = build(
            &docker_ubuntu(),
            &request(spec("bzip2", "1.0.6", "", ("dummy", "dummy"))),
            ModuleScheme::Easybuild,
            None,
            None,
        );
        let content = document.content();
        assert!(!content.contains("git clone"));
        assert!(!content.contains("rm -rf easybuild-"));
        // The fixed scratch cleanup is always present.
        assert!(content.contains("rm -rf /scratch/build\n"));
    }

    #[test]
    fn test_builder_is_deterministic() {
        let bootstrap = docker_ubuntu();
        let request = request(spec("bzip2", "1.0.6", "", ("intel", "2017a")));
        let a = build(&bootstrap, &request, ModuleScheme::Hierarchical, None, None);
        let b = build(&bootstrap, &request, ModuleScheme::Hierarchical, None, None);
        assert_eq!(a, b);
    }

    #[test]
    fn test_runscript_is_fixed_template() {
        let document = build(
            &docker_ubuntu(),
            &request(spec("bzip2", "1.0.6", "", ("dummy", "dummy"))),
            ModuleScheme::Easybuild,
            None,
            None,
        );
        assert!(document.content().contains("\n%runscript\neval \"$@\"\n"));
    }

    #[test]
    fn test_write_to_requires_directory() {
        let document = build(
            &docker_ubuntu(),
            &request(spec("bzip2", "1.0.6", "", ("dummy", "dummy"))),
            ModuleScheme::Easybuild,
            None,
            None,
        );
        let err = document
            .write_to(Path::new("/nonexistent/output/dir"))
            .unwrap_err();
        assert!(matches!(err, SindefError::InvalidTargetDirectory { .. }));
    }

    #[test]
    fn test_write_to_uses_computed_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let document = build(
            &docker_ubuntu(),
            &request(spec("bzip2", "1.0.6", "", ("dummy", "dummy"))),
            ModuleScheme::Easybuild,
            None,
            None,
        );
        let path = document.write_to(dir.path()).unwrap();
        assert_eq!(path, dir.path().join("Singularity.bzip2-1.0.6"));
        let written = fs::read_to_string(&path).unwrap();
        assert_eq!(written, document.content());
    }
}
