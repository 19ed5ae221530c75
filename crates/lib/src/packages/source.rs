//! Configuring, compiling, staging and packaging source distributions.
//!
//! A [`BuildSpec`] drives a five-stage pipeline:
//!
//! ```text
//! get -> configure -> build -> stage -> package
//! ```
//!
//! Each stage after `get` may name a sentinel file; when the file exists the
//! stage is skipped. `get` is skipped when the unpacked source directory
//! exists. Forcing a stage (`force = "build"`) overrides the sentinels of that
//! stage and every later one. A failed stage leaves its sentinel absent, so
//! rerunning the same spec resumes from there.
//!
//! Packages are produced with `fpm` from the staging directory.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::consts::{DEFAULT_CONFIGURE_SENTINEL, PACKAGER, PACKAGER_INSTALLER, STAGE_DIR_NAME, WORKDIR_MODE};
use crate::environment::have_program;
use crate::exec::{Exec, ExecError};
use crate::files::{self, DirectoryOptions};
use crate::packages;
use crate::session::Session;
use crate::shell;
use crate::template::{self, TemplateError};

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Stage {
  /// Download and unpack the sources.
  #[serde(rename = "get", alias = "fetch")]
  Fetch,
  /// `./configure --flags`
  #[serde(rename = "configure")]
  Configure,
  /// `make`
  #[serde(rename = "build")]
  Build,
  /// `make install` into the staging directory.
  #[serde(rename = "stage")]
  Install,
  /// Staging directory to package file.
  #[serde(rename = "package")]
  Package,
}

impl Stage {
  pub const ALL: [Stage; 5] = [Stage::Fetch, Stage::Configure, Stage::Build, Stage::Install, Stage::Package];

  pub fn as_str(&self) -> &'static str {
    match self {
      Stage::Fetch => "get",
      Stage::Configure => "configure",
      Stage::Build => "build",
      Stage::Install => "stage",
      Stage::Package => "package",
    }
  }

  /// Look up a stage by name. `fetch` is accepted for `get`.
  pub fn from_name(name: &str) -> Option<Self> {
    match name {
      "get" | "fetch" => Some(Stage::Fetch),
      "configure" => Some(Stage::Configure),
      "build" => Some(Stage::Build),
      "stage" => Some(Stage::Install),
      "package" => Some(Stage::Package),
      _ => None,
    }
  }
}

impl fmt::Display for Stage {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

/// Which stages ignore their sentinels.
///
/// Forcing is downward closed: the earliest stage named forces itself and
/// every later stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Forcing {
  from: Option<Stage>,
}

impl Forcing {
  /// Force nothing.
  pub fn none() -> Self {
    Self::default()
  }

  /// Force `stage` and everything after it.
  pub fn from_stage(stage: Stage) -> Self {
    Self { from: Some(stage) }
  }

  /// Parse a comma-separated list of stage names. Unknown or empty tokens
  /// are ignored.
  pub fn parse(spec: &str) -> Self {
    Self {
      from: spec.split(',').filter_map(|token| Stage::from_name(token.trim())).min(),
    }
  }

  pub fn is_forced(&self, stage: Stage) -> bool {
    self.from.is_some_and(|from| stage >= from)
  }

  pub fn forced_stages(&self) -> Vec<Stage> {
    Stage::ALL.into_iter().filter(|s| self.is_forced(*s)).collect()
  }
}

/// Decompression mode for `tar`, inferred from the download URI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
  Gzip,
  Bzip2,
  /// Unrecognised extension: let `tar` read the stream as is.
  None,
}

impl Compression {
  /// The extension may appear anywhere in the URI, since mirror links such
  /// as `.../php-5.4.0.tar.bz2/from/a/mirror` are common.
  pub fn from_uri(uri: &str) -> Self {
    if uri.contains(".tar.gz") || uri.contains(".tgz") {
      Compression::Gzip
    } else if uri.contains(".tar.bz2") {
      Compression::Bzip2
    } else {
      Compression::None
    }
  }

  pub fn tar_flag(&self) -> &'static str {
    match self {
      Compression::Gzip => "z",
      Compression::Bzip2 => "j",
      Compression::None => "",
    }
  }
}

fn default_clean_command() -> String {
  "make clean".to_string()
}

fn default_build_command() -> String {
  "make".to_string()
}

fn default_install_command() -> String {
  "DESTDIR=%(stage_root)s make install".to_string()
}

/// One source build request.
///
/// Deserializable so build definitions can live in configuration:
///
/// ```
/// use hostcraft_lib::packages::source::{BuildSpec, Stage};
///
/// let spec = BuildSpec::from_json(r#"{
///   "name": "php",
///   "version": "5.4.0",
///   "iteration": 3,
///   "workdir": "/opt/build",
///   "uri": "http://php.net/get/%(package_name)s.tar.bz2/from/us.php.net/mirror",
///   "type": "deb",
///   "with": ["mysql"],
///   "sentinels": {"build": "sapi/cli/php"},
///   "force": "stage"
/// }"#).unwrap();
///
/// assert_eq!(spec.sentinel(Stage::Configure).as_deref(), Some("Makefile"));
/// assert!(spec.forcing().is_forced(Stage::Package));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildSpec {
  /// Short project name, e.g. `php` in `php-5.4.0.tar.gz`. Also the
  /// expected prefix of the unpacked directory.
  pub name: String,
  /// Upstream release version.
  pub version: String,
  /// Local build revision, bumped for each distributed rebuild.
  pub iteration: u32,
  /// Absolute base directory. Sources unpack into `<workdir>/<name>-<version>`
  /// and the staging directory is `<workdir>/stage`.
  pub workdir: String,
  /// Download URI template; may use `%(name)s`, `%(version)s` and
  /// `%(package_name)s`.
  pub uri: String,
  /// Package type passed to `fpm -t`, e.g. `deb` or `rpm`.
  #[serde(rename = "type")]
  pub package_type: String,
  /// Each entry becomes `--enable-<entry>`.
  #[serde(default)]
  pub enable: Vec<String>,
  /// Each entry becomes `--with-<entry>`.
  #[serde(default)]
  pub with: Vec<String>,
  /// Extra configure flags, passed verbatim.
  #[serde(default)]
  pub flags: String,
  /// OS packages to install before configuring.
  #[serde(default)]
  pub dependencies: Vec<String>,
  /// Per-stage sentinel paths. Relative to the source directory, except
  /// `stage` (relative to the staging directory) and `package` (relative
  /// to `workdir`).
  #[serde(default)]
  pub sentinels: BTreeMap<Stage, String>,
  /// Comma-separated stage names to force.
  #[serde(default)]
  pub force: String,
  #[serde(default = "default_clean_command")]
  pub clean_command: String,
  #[serde(default = "default_build_command")]
  pub build_command: String,
  /// May use `%(stage_root)s`.
  #[serde(default = "default_install_command")]
  pub install_command: String,
}

impl BuildSpec {
  pub fn new(
    name: impl Into<String>,
    version: impl Into<String>,
    iteration: u32,
    workdir: impl Into<String>,
    uri: impl Into<String>,
    package_type: impl Into<String>,
  ) -> Self {
    Self {
      name: name.into(),
      version: version.into(),
      iteration,
      workdir: workdir.into(),
      uri: uri.into(),
      package_type: package_type.into(),
      enable: Vec::new(),
      with: Vec::new(),
      flags: String::new(),
      dependencies: Vec::new(),
      sentinels: BTreeMap::new(),
      force: String::new(),
      clean_command: default_clean_command(),
      build_command: default_build_command(),
      install_command: default_install_command(),
    }
  }

  pub fn enable<I, T>(mut self, features: I) -> Self
  where
    I: IntoIterator<Item = T>,
    T: Into<String>,
  {
    self.enable.extend(features.into_iter().map(Into::into));
    self
  }

  pub fn with<I, T>(mut self, packages: I) -> Self
  where
    I: IntoIterator<Item = T>,
    T: Into<String>,
  {
    self.with.extend(packages.into_iter().map(Into::into));
    self
  }

  pub fn flags(mut self, flags: impl Into<String>) -> Self {
    self.flags = flags.into();
    self
  }

  pub fn dependencies<I, T>(mut self, packages: I) -> Self
  where
    I: IntoIterator<Item = T>,
    T: Into<String>,
  {
    self.dependencies.extend(packages.into_iter().map(Into::into));
    self
  }

  pub fn sentinel(&self, stage: Stage) -> Option<String> {
    match self.sentinels.get(&stage) {
      Some(path) => Some(path.clone()),
      None if stage == Stage::Configure => Some(DEFAULT_CONFIGURE_SENTINEL.to_string()),
      None => None,
    }
  }

  /// Parse a spec from JSON. Missing optional fields take their defaults.
  pub fn from_json(json: &str) -> Result<Self, SourceBuildError> {
    serde_json::from_str(json).map_err(|e| SourceBuildError::InvalidSpec(e.to_string()))
  }

  pub fn with_sentinel(mut self, stage: Stage, path: impl Into<String>) -> Self {
    self.sentinels.insert(stage, path.into());
    self
  }

  pub fn with_force(mut self, force: impl Into<String>) -> Self {
    self.force = force.into();
    self
  }

  pub fn with_install_command(mut self, command: impl Into<String>) -> Self {
    self.install_command = command.into();
    self
  }

  /// `<name>-<version>`
  pub fn package_name(&self) -> String {
    format!("{}-{}", self.name, self.version)
  }

  pub fn source_dir(&self) -> String {
    shell::posix_join(&[&self.workdir, &self.package_name()])
  }

  pub fn stage_dir(&self) -> String {
    shell::posix_join(&[&self.workdir, STAGE_DIR_NAME])
  }

  /// `<name>-<version>-<iteration>.<type>`
  pub fn package_file_name(&self) -> String {
    format!("{}-{}-{}.{}", self.name, self.version, self.iteration, self.package_type)
  }

  pub fn package_path(&self) -> String {
    shell::posix_join(&[&self.workdir, &self.package_file_name()])
  }

  pub fn forcing(&self) -> Forcing {
    Forcing::parse(&self.force)
  }

  /// Values available to the URI template.
  pub fn template_context(&self) -> BTreeMap<&'static str, String> {
    BTreeMap::from([
      ("name", self.name.clone()),
      ("version", self.version.clone()),
      ("package_name", self.package_name()),
    ])
  }

  pub fn resolved_uri(&self) -> Result<String, TemplateError> {
    template::render(&self.uri, &self.template_context())
  }

  /// Configure arguments: `flags`, then `--with-*`, then `--enable-*`, each
  /// in input order.
  pub fn configure_flags(&self) -> String {
    let flags = (!self.flags.trim().is_empty()).then(|| self.flags.trim().to_string());
    let with = self.with.iter().map(|w| shell::quote(&format!("--with-{w}")).into_owned());
    let enable = self.enable.iter().map(|e| shell::quote(&format!("--enable-{e}")).into_owned());
    flags.into_iter().chain(with).chain(enable).collect::<Vec<_>>().join(" ")
  }

  /// Stage sentinel as seen from inside the source directory.
  pub fn stage_sentinel(&self) -> Option<String> {
    self
      .sentinel(Stage::Install)
      .map(|s| shell::posix_join(&["..", &self.stage_dir(), &s]))
  }

  pub fn validate(&self) -> Result<(), SourceBuildError> {
    if self.name.trim().is_empty() {
      return Err(SourceBuildError::InvalidSpec("name must not be empty".to_string()));
    }
    if self.version.trim().is_empty() {
      return Err(SourceBuildError::InvalidSpec("version must not be empty".to_string()));
    }
    if !self.workdir.starts_with('/') {
      return Err(SourceBuildError::InvalidSpec(format!(
        "workdir must be an absolute path, got '{}'",
        self.workdir
      )));
    }
    Ok(())
  }
}

/// Errors that abort a source build.
#[derive(Debug, Error)]
pub enum SourceBuildError {
  /// A required tool is missing and cannot be installed automatically.
  #[error("no {tool} found! Please {hint}")]
  MissingDependency { tool: String, hint: String },

  #[error("malformed template: {0}")]
  Template(#[from] TemplateError),

  #[error("invalid build spec: {0}")]
  InvalidSpec(String),

  /// A stage command failed; rerunning resumes from this stage.
  #[error("{stage} stage failed: {source}")]
  StageFailed { stage: Stage, source: ExecError },

  #[error(transparent)]
  Exec(#[from] ExecError),
}

/// What happened to one stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageOutcome {
  Ran,
  Skipped,
}

/// Result of a completed pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOutcome {
  /// Where the package file is (or was already) written.
  pub package_path: String,
  pub stages: Vec<(Stage, StageOutcome)>,
}

impl BuildOutcome {
  pub fn ran(&self, stage: Stage) -> bool {
    self.stages.contains(&(stage, StageOutcome::Ran))
  }
}

/// Build and package `spec`, running only the stages that are needed.
pub async fn build<S: Session>(ctx: &Exec<'_, S>, spec: &BuildSpec) -> Result<BuildOutcome, SourceBuildError> {
  spec.validate()?;

  // Resolve every template before touching the target.
  let uri = spec.resolved_uri()?;
  let stage_dir = spec.stage_dir();
  let install_command = template::render(&spec.install_command, &BTreeMap::from([("stage_root", stage_dir.as_str())]))?;

  ensure_packager(ctx).await?;

  let pipeline = Pipeline {
    ctx,
    spec,
    forcing: spec.forcing(),
    source_dir: spec.source_dir(),
    stage_dir,
  };
  info!(package = %spec.package_name(), forced = ?pipeline.forcing.forced_stages(), "starting source build");

  files::directory(ctx, &spec.workdir, &DirectoryOptions::new().with_mode(WORKDIR_MODE)).await?;

  let mut stages = Vec::with_capacity(Stage::ALL.len());
  for stage in Stage::ALL {
    let outcome = match stage {
      Stage::Fetch => pipeline.fetch(&uri).await,
      Stage::Configure => pipeline.configure().await,
      Stage::Build => pipeline.build().await,
      Stage::Install => pipeline.install(&install_command).await,
      Stage::Package => pipeline.package().await,
    }
    .map_err(|source| SourceBuildError::StageFailed { stage, source })?;
    stages.push((stage, outcome));
  }

  Ok(BuildOutcome {
    package_path: spec.package_path(),
    stages,
  })
}

/// Make sure `fpm` is available, installing it through RubyGems if possible.
async fn ensure_packager<S: Session>(ctx: &Exec<'_, S>) -> Result<(), SourceBuildError> {
  if have_program(ctx, PACKAGER).await? {
    return Ok(());
  }
  if !have_program(ctx, PACKAGER_INSTALLER).await? {
    return Err(SourceBuildError::MissingDependency {
      tool: PACKAGER.to_string(),
      hint: format!("install Rubygems and then '{PACKAGER_INSTALLER} install {PACKAGER}'."),
    });
  }
  info!(tool = PACKAGER, "not found, installing with {PACKAGER_INSTALLER}");
  packages::rubygem(ctx, PACKAGER).await?;
  Ok(())
}

struct Pipeline<'p, 'a, S: Session> {
  ctx: &'p Exec<'a, S>,
  spec: &'p BuildSpec,
  forcing: Forcing,
  source_dir: String,
  stage_dir: String,
}

impl<S: Session> Pipeline<'_, '_, S> {
  /// Whether `stage` must run: it is forced, has no sentinel, or its
  /// sentinel (checked from `ctx`) is missing.
  async fn should_run(&self, ctx: &Exec<'_, S>, stage: Stage, sentinel: Option<&str>) -> Result<bool, ExecError> {
    if self.forcing.is_forced(stage) {
      info!(%stage, "forced, running");
      return Ok(true);
    }
    match sentinel {
      Some(path) if files::exists(ctx, path).await? => {
        info!(%stage, sentinel = %path, "skipping: sentinel exists");
        Ok(false)
      }
      _ => {
        info!(%stage, "sentinel missing, running");
        Ok(true)
      }
    }
  }

  async fn fetch(&self, uri: &str) -> Result<StageOutcome, ExecError> {
    if !self.forcing.is_forced(Stage::Fetch) && files::exists(self.ctx, &self.source_dir).await? {
      info!(stage = %Stage::Fetch, source = %self.source_dir, "skipping: source directory exists");
      return Ok(StageOutcome::Skipped);
    }

    let flag = Compression::from_uri(uri).tar_flag();
    info!(stage = %Stage::Fetch, uri = %uri, "downloading sources");
    self
      .ctx
      .within(&self.spec.workdir)
      .run(&format!("curl -L {} | tar x{flag}f -", shell::quote(uri)))
      .await?;
    Ok(StageOutcome::Ran)
  }

  async fn configure(&self) -> Result<StageOutcome, ExecError> {
    // Dependencies are installed regardless of the sentinel.
    packages::package(self.ctx, &self.spec.dependencies).await?;

    let src = self.ctx.within(&self.source_dir);

    // Leftovers from a previous bad build can break a reconfigure.
    if self.forcing.is_forced(Stage::Configure) && files::exists(&src, DEFAULT_CONFIGURE_SENTINEL).await? {
      src.run(&self.spec.clean_command).await?;
    }

    let sentinel = self.spec.sentinel(Stage::Configure);
    if !self.should_run(&src, Stage::Configure, sentinel.as_deref()).await? {
      return Ok(StageOutcome::Skipped);
    }

    let flags = self.spec.configure_flags();
    let command = if flags.is_empty() {
      "./configure".to_string()
    } else {
      format!("./configure {flags}")
    };
    src.run(&command).await?;
    Ok(StageOutcome::Ran)
  }

  async fn build(&self) -> Result<StageOutcome, ExecError> {
    let src = self.ctx.within(&self.source_dir);
    let sentinel = self.spec.sentinel(Stage::Build);
    if !self.should_run(&src, Stage::Build, sentinel.as_deref()).await? {
      return Ok(StageOutcome::Skipped);
    }
    src.run(&self.spec.build_command).await?;
    Ok(StageOutcome::Ran)
  }

  /// Failures here are logged, not raised; a missing stage sentinel makes
  /// the next run retry.
  async fn install(&self, install_command: &str) -> Result<StageOutcome, ExecError> {
    let src = self.ctx.within(&self.source_dir);
    let sentinel = self.spec.stage_sentinel();
    if !self.should_run(&src, Stage::Install, sentinel.as_deref()).await? {
      return Ok(StageOutcome::Skipped);
    }

    let tolerant = src.warn_only();
    // A changed --prefix would otherwise leave both prefixes in the stage.
    if self.forcing.is_forced(Stage::Install) {
      let removed = tolerant.run(&format!("rm -rf {}", shell::quote(&self.stage_dir))).await?;
      if removed.failed() {
        warn!(stage_dir = %self.stage_dir, code = ?removed.exit_code, "could not remove staging directory");
      }
    }

    let installed = tolerant.run(install_command).await?;
    if installed.failed() {
      warn!(code = ?installed.exit_code, stderr = %installed.stderr, "install into staging directory failed");
    }
    Ok(StageOutcome::Ran)
  }

  async fn package(&self) -> Result<StageOutcome, ExecError> {
    let workdir = self.ctx.within(&self.spec.workdir);
    let sentinel = self.spec.sentinel(Stage::Package);
    if !self.should_run(&workdir, Stage::Package, sentinel.as_deref()).await? {
      return Ok(StageOutcome::Skipped);
    }

    let spec = self.spec;
    let command = format!(
      "fpm -s dir -t {} --name {} --version {} --iteration {} --package {} .",
      shell::quote(&spec.package_type),
      shell::quote(&spec.name),
      shell::quote(&spec.version),
      spec.iteration,
      shell::quote(&spec.package_path()),
    );
    self.ctx.within(&self.stage_dir).run(&command).await?;
    Ok(StageOutcome::Ran)
  }
}
