//! Layer boundary check for the template API crate.
//!
//! `backend/src` is split into four layers. Each may only reach the layers
//! listed in [`Layer::may_reach`]:
//!
//! | layer        | may reach                          |
//! |--------------|------------------------------------|
//! | `domain`     | `domain`                           |
//! | `inbound`    | `domain`, `inbound`                |
//! | `middleware` | `domain`, `inbound`, `middleware`  |
//! | `outbound`   | `domain`, `outbound`               |
//!
//! Third-party crates that tie code to a transport are confined to the layers
//! that own that transport (see [`CONFINED_CRATES`]). Throttling with
//! `governor` is a request-lifecycle concern and stays in `middleware`; the
//! HTTP client stays in `outbound`; OpenAPI annotations stay in `inbound`.
//!
//! Paths are resolved against the module they appear in, so `super::`
//! chains that climb out of a layer are caught as well as `crate::` paths.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use syn::visit::Visit;

/// Library name used by the binary and integration tests.
const CRATE_NAME: &str = "template_api";

/// A module tree under `backend/src` with its own dependency rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Layer {
    /// Failure taxonomy, identifiers, and ports.
    Domain,
    /// HTTP adapters: classification, envelopes, probes.
    Inbound,
    /// Request-lifecycle layers wrapped around the app.
    Middleware,
    /// Driven adapters such as the integration client.
    Outbound,
}

impl Layer {
    /// Every layer, in dependency order.
    pub const ALL: [Self; 4] = [Self::Domain, Self::Inbound, Self::Middleware, Self::Outbound];

    /// Directory (and module) name of the layer.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Domain => "domain",
            Self::Inbound => "inbound",
            Self::Middleware => "middleware",
            Self::Outbound => "outbound",
        }
    }

    /// Layer owning the module called `name`, if any.
    #[must_use]
    pub fn from_module(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|layer| layer.name() == name)
    }

    /// Whether code in `self` may use items from `target`.
    #[must_use]
    pub const fn may_reach(self, target: Self) -> bool {
        matches!(
            (self, target),
            (_, Self::Domain)
                | (Self::Inbound, Self::Inbound)
                | (Self::Middleware, Self::Inbound | Self::Middleware)
                | (Self::Outbound, Self::Outbound)
        )
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Crates usable only from the listed layers.
pub const CONFINED_CRATES: &[(&str, &[Layer])] = &[
    ("actix", &[Layer::Inbound, Layer::Middleware]),
    ("actix_web", &[Layer::Inbound, Layer::Middleware]),
    ("actix_http", &[Layer::Middleware]),
    ("actix_service", &[Layer::Middleware]),
    ("futures_util", &[Layer::Middleware]),
    ("governor", &[Layer::Middleware]),
    ("reqwest", &[Layer::Outbound]),
    ("utoipa", &[Layer::Inbound]),
    ("utoipa_swagger_ui", &[Layer::Inbound]),
];

fn confinement(crate_name: &str) -> Option<&'static [Layer]> {
    CONFINED_CRATES
        .iter()
        .find(|(name, _)| *name == crate_name)
        .map(|(_, layers)| *layers)
}

/// What a violating path reached for.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Breach {
    /// A module in a layer the source may not reach.
    Layer(Layer),
    /// A crate confined to other layers.
    Crate {
        /// Crate root as written in the path.
        name: String,
        /// Layers allowed to use it.
        owners: &'static [Layer],
    },
}

/// A boundary crossing found in one file.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Violation {
    /// File path relative to `backend/src`.
    pub file: PathBuf,
    /// Layer the file belongs to.
    pub layer: Layer,
    /// What the file reached for.
    pub breach: Breach,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: ", self.file.display())?;
        match &self.breach {
            Breach::Layer(target) => write!(f, "{} must not reach crate::{target}", self.layer),
            Breach::Crate { name, owners } => {
                let owners = owners
                    .iter()
                    .map(|layer| layer.name())
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "`{name}` is confined to {owners}, not {}", self.layer)
            }
        }
    }
}

/// Reasons the check could not pass.
#[derive(Debug, thiserror::Error)]
pub enum LintError {
    /// A source file or directory could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Read {
        /// Path being read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// A source file is not valid Rust.
    #[error("failed to parse {}: {message}", file.display())]
    Parse {
        /// File path relative to `backend/src`.
        file: PathBuf,
        /// Parser message.
        message: String,
    },
    /// A source file does not sit under any layer directory.
    #[error("{} is outside the domain, inbound, middleware, and outbound layers", .0.display())]
    UnknownLayer(PathBuf),
    /// Boundary crossings were found.
    #[error("{} layer boundary violation(s):\n{}", .0.len(), render(.0))]
    Violations(Vec<Violation>),
}

fn render(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(|violation| format!("  - {violation}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// A Rust source file to check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Path relative to `backend/src`.
    pub file: PathBuf,
    /// Rust source text.
    pub contents: String,
}

impl SourceFile {
    /// Source `contents` located at `file` under `backend/src`.
    pub fn new(file: impl Into<PathBuf>, contents: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            contents: contents.into(),
        }
    }

    fn layer(&self) -> Option<Layer> {
        let first = self.file.components().next()?;
        Layer::from_module(first.as_os_str().to_str()?)
    }

    /// Module path of the file, e.g. `domain/ports/mod.rs` → `domain::ports`.
    fn module_path(&self) -> Vec<String> {
        let mut segments: Vec<String> = self
            .file
            .with_extension("")
            .components()
            .map(|component| component.as_os_str().to_string_lossy().into_owned())
            .collect();
        if segments.last().is_some_and(|last| last == "mod") {
            segments.pop();
        }
        segments
    }
}

/// Check every source file under `backend_dir/src/<layer>`.
///
/// Returns the number of files checked.
///
/// # Errors
/// Returns [`LintError`] when a file cannot be read or parsed, or when any
/// boundary is crossed.
pub fn check_backend(backend_dir: &Path) -> Result<usize, LintError> {
    let src = backend_dir.join("src");
    let mut sources = Vec::new();
    for layer in Layer::ALL {
        let dir = src.join(layer.name());
        if dir.is_dir() {
            gather(&src, &dir, &mut sources)?;
        }
    }
    sources.sort_by(|a, b| a.file.cmp(&b.file));
    check_sources(&sources)?;
    Ok(sources.len())
}

/// Check in-memory sources.
///
/// # Errors
/// Returns [`LintError`] for unparseable sources, files outside a layer, or
/// boundary crossings. Violations from every file are reported together.
pub fn check_sources(sources: &[SourceFile]) -> Result<(), LintError> {
    let mut violations = Vec::new();
    for source in sources {
        violations.extend(check_source(source)?);
    }
    if violations.is_empty() {
        Ok(())
    } else {
        Err(LintError::Violations(violations))
    }
}

fn check_source(source: &SourceFile) -> Result<Vec<Violation>, LintError> {
    let layer = source
        .layer()
        .ok_or_else(|| LintError::UnknownLayer(source.file.clone()))?;
    let parsed = syn::parse_file(&source.contents).map_err(|err| LintError::Parse {
        file: source.file.clone(),
        message: err.to_string(),
    })?;

    let mut collector = PathCollector::new(source.module_path());
    collector.visit_file(&parsed);

    let mut breaches: Vec<Breach> = collector
        .targets
        .into_iter()
        .filter_map(|target| target.breach_from(layer))
        .collect();
    breaches.sort();
    breaches.dedup();

    Ok(breaches
        .into_iter()
        .map(|breach| Violation {
            file: source.file.clone(),
            layer,
            breach,
        })
        .collect())
}

/// Where a path points once resolved against its module.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Target {
    /// A module inside this crate, by its top-level module name.
    Local(String),
    /// The root of another crate, or a bare identifier.
    External(String),
}

impl Target {
    fn breach_from(self, layer: Layer) -> Option<Breach> {
        match self {
            Self::Local(root) => Layer::from_module(&root)
                .filter(|target| !layer.may_reach(*target))
                .map(Breach::Layer),
            Self::External(name) => confinement(&name)
                .filter(|owners| !owners.contains(&layer))
                .map(|owners| Breach::Crate { name, owners }),
        }
    }
}

/// Gathers resolved path targets, tracking inline `mod` nesting so that
/// `self` and `super` resolve correctly.
struct PathCollector {
    scope: Vec<String>,
    targets: Vec<Target>,
}

impl PathCollector {
    fn new(scope: Vec<String>) -> Self {
        Self {
            scope,
            targets: Vec::new(),
        }
    }

    fn record(&mut self, segments: &[String]) {
        if let Some(target) = self.resolve(segments) {
            self.targets.push(target);
        }
    }

    fn resolve(&self, segments: &[String]) -> Option<Target> {
        let (first, rest) = segments.split_first()?;
        match first.as_str() {
            "crate" => rest.first().cloned().map(Target::Local),
            name if name == CRATE_NAME => rest.first().cloned().map(Target::Local),
            "self" => self.scope.first().cloned().map(Target::Local),
            "super" => {
                let climbs = 1 + rest.iter().take_while(|segment| *segment == "super").count();
                let kept = self.scope.len().saturating_sub(climbs);
                self.scope
                    .get(..kept)
                    .and_then(<[String]>::first)
                    .or_else(|| rest.get(climbs - 1))
                    .cloned()
                    .map(Target::Local)
            }
            "Self" => None,
            name if Layer::from_module(name).is_some() => Some(Target::Local(name.to_owned())),
            name => Some(Target::External(name.to_owned())),
        }
    }

    fn record_use_tree(&mut self, tree: &syn::UseTree, prefix: &mut Vec<String>) {
        match tree {
            syn::UseTree::Path(path) => {
                prefix.push(path.ident.to_string());
                self.record_use_tree(&path.tree, prefix);
                prefix.pop();
            }
            syn::UseTree::Name(syn::UseName { ident })
            | syn::UseTree::Rename(syn::UseRename { ident, .. }) => {
                prefix.push(ident.to_string());
                self.record(prefix);
                prefix.pop();
            }
            syn::UseTree::Glob(_) => {
                if !prefix.is_empty() {
                    self.record(prefix);
                }
            }
            syn::UseTree::Group(group) => {
                for item in &group.items {
                    self.record_use_tree(item, prefix);
                }
            }
        }
    }
}

impl<'ast> Visit<'ast> for PathCollector {
    fn visit_item_mod(&mut self, node: &'ast syn::ItemMod) {
        self.scope.push(node.ident.to_string());
        syn::visit::visit_item_mod(self, node);
        self.scope.pop();
    }

    fn visit_item_use(&mut self, node: &'ast syn::ItemUse) {
        self.record_use_tree(&node.tree, &mut Vec::new());
    }

    fn visit_path(&mut self, node: &'ast syn::Path) {
        let segments: Vec<String> = node
            .segments
            .iter()
            .map(|segment| segment.ident.to_string())
            .collect();
        self.record(&segments);
        syn::visit::visit_path(self, node);
    }
}

fn gather(src: &Path, dir: &Path, sources: &mut Vec<SourceFile>) -> Result<(), LintError> {
    let read_error = |path: &Path| {
        let path = path.to_path_buf();
        move |source| LintError::Read { path, source }
    };
    for entry in fs::read_dir(dir).map_err(read_error(dir))? {
        let path = entry.map_err(read_error(dir))?.path();
        if path.is_dir() {
            gather(src, &path, sources)?;
        } else if path.extension().is_some_and(|ext| ext == "rs") {
            let contents = fs::read_to_string(&path).map_err(read_error(&path))?;
            let file = path.strip_prefix(src).unwrap_or(&path).to_path_buf();
            sources.push(SourceFile { file, contents });
        }
    }
    Ok(())
}
