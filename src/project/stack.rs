//! Stack run: turn the configured sources into one official → named table.
//!
//! ```text
//! sources ──classify──► supplier? ──yes, alone──► extract verbatim
//!                          │
//!                          ▼
//!              intermediaries (supplier or provider)
//!                          │
//!      for each source:  decode ─► rename if native ─► filtered merge
//!                          │
//!                          ▼
//!       combine (accumulator ∘ inverted intermediaries, intermediaries)
//!                          │
//!                          ▼
//!            base table + parameter side-file + history
//! ```

use std::collections::hash_map::Entry;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rayon::prelude::*;
use rustc_hash::FxHashMap;

use super::cache::MappingsCache;
use super::config::{CompiledConventions, StackConfig};
use super::history::StackHistory;
use super::provider::{DescriptorLookup, IntermediaryProvider};
use super::source::{ClassifiedSource, ResolvedFormat, classify_all, intermediary_supplier};
use super::StackError;
use crate::base::Name;
use crate::base::constants::{
    INTERMEDIARY, INTERMEDIARY_ARTIFACT, INTERMEDIARY_FILE, NAMED, OFFICIAL, STACK_ARTIFACT,
    STACK_HISTORY_FILE, TINY_ARCHIVE_PATH,
};
use crate::interchange::archive::write_archive;
use crate::interchange::compressed::read_text;
use crate::interchange::{
    CombinedMappings, InvertScope, MappingModel, MergeFilter, MergeStats, ParameterNames,
    TinyHeader, WriteMode, duplicate_column, read_tiny, tiny_v2_to_v1, write_tiny,
};

// ============================================================================
// RUN LAYOUT
// ============================================================================

/// Names and artifact paths of one run, decided before anything is built.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StackRun {
    /// Directory holding every artifact of the run.
    pub dir: PathBuf,
    pub name: String,
    pub version: String,
    /// Raw-namespace version the artifacts are named after.
    pub target_version: String,
    /// The provenance record already lists this exact stack.
    pub known: bool,
    /// The official/named/intermediary table.
    pub base: PathBuf,
    /// Parameter-name side-file.
    pub params: PathBuf,
    /// Jar packaging of the base table.
    pub jar: PathBuf,
    /// Intermediary table of `target_version`, kept in that version's
    /// directory.
    pub intermediary: PathBuf,
    /// Provenance record; only multi-source stacks have one.
    pub history: Option<PathBuf>,
}

impl StackRun {
    /// Delete every artifact of this run. Missing files are fine.
    pub fn clear(&self) -> Result<(), StackError> {
        for path in [&self.base, &self.params, &self.jar, &self.intermediary] {
            match std::fs::remove_file(path) {
                Ok(()) => tracing::debug!("deleted {}", path.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}

/// How the base table came to be.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StackOutcome {
    /// It already existed.
    Cached,
    /// No sources: the intermediary column doubles as `named`.
    Duplicated,
    /// A single source already had the final shape.
    Extracted,
    /// Sources were merged.
    Merged,
}

/// Result of [`MappingsStack::run`].
#[derive(Clone, Debug)]
pub struct StackOutput {
    pub run: StackRun,
    pub outcome: StackOutcome,
    /// A parameter side-file exists for this run.
    pub has_params: bool,
    /// Accumulated merge statistics; zero unless merged.
    pub stats: MergeStats,
}

// ============================================================================
// STACK
// ============================================================================

/// Builds the mapping table for a [`StackConfig`].
pub struct MappingsStack<P> {
    config: StackConfig,
    provider: P,
    descriptors: Option<Box<dyn DescriptorLookup>>,
    cache: Option<Arc<MappingsCache>>,
}

impl<P: IntermediaryProvider> MappingsStack<P> {
    pub fn new(config: StackConfig, provider: P) -> Self {
        Self {
            config,
            provider,
            descriptors: None,
            cache: None,
        }
    }

    /// Fill missing field descriptors of decoded sources through `lookup`.
    pub fn with_descriptors(mut self, lookup: impl DescriptorLookup + 'static) -> Self {
        self.descriptors = Some(Box::new(lookup));
        self
    }

    /// Share decoded sources with other runs.
    pub fn with_cache(mut self, cache: Arc<MappingsCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn config(&self) -> &StackConfig {
        &self.config
    }

    /// Decide the run's name, version and artifact paths.
    pub fn plan(&self) -> Result<StackRun, StackError> {
        let config = &self.config;
        let dir = config.version_dir(&config.target_version);

        let (name, version, target_version, known, history) = match config.sources.as_slice() {
            [] => {
                tracing::info!(
                    "setting up mappings ({INTERMEDIARY_ARTIFACT} {})",
                    config.target_version
                );
                (
                    INTERMEDIARY_ARTIFACT.to_string(),
                    config.target_version.clone(),
                    config.target_version.clone(),
                    false,
                    None,
                )
            }
            [only] => {
                tracing::info!(
                    "setting up mappings ({} {}@{})",
                    only.name,
                    only.version,
                    only.target_version
                );
                (
                    only.name.clone(),
                    only.version.clone(),
                    only.target_version.clone(),
                    false,
                    None,
                )
            }
            sources => {
                tracing::info!("setting up mappings ({} files in stack)", sources.len());
                let path = dir.join(STACK_HISTORY_FILE);
                let expected: Vec<String> = sources.iter().map(|s| s.history_entry()).collect();
                let found = StackHistory::new(&path).lookup(&expected)?;
                (
                    STACK_ARTIFACT.to_string(),
                    found.version,
                    config.target_version.clone(),
                    found.known,
                    Some(path),
                )
            }
        };

        let stem = format!("{name}-tiny-{target_version}-{version}");
        Ok(StackRun {
            base: dir.join(format!("{stem}-base.tiny")),
            params: dir.join(format!("{name}-params-{target_version}-{version}")),
            jar: dir.join(format!("{stem}.jar")),
            intermediary: config.version_dir(&target_version).join(INTERMEDIARY_FILE),
            dir,
            name,
            version,
            target_version,
            known,
            history,
        })
    }

    /// Produce the run's artifacts, reusing them when they already exist.
    pub fn run(&self) -> Result<StackOutput, StackError> {
        self.config.validate()?;
        if let Some(precondition) = &self.config.precondition {
            if !precondition.exists() {
                return Err(StackError::MissingPrecondition(precondition.clone()));
            }
        }

        let run = self.plan()?;
        let mut output = if run.base.exists() {
            tracing::info!("using cached {}", run.base.display());
            StackOutput {
                has_params: run.params.exists(),
                outcome: StackOutcome::Cached,
                stats: MergeStats::default(),
                run,
            }
        } else {
            std::fs::create_dir_all(&run.dir)?;
            self.build(run)?
        };

        if self.config.package_jar && !output.run.jar.exists() {
            tracing::info!("packaging {}", output.run.jar.display());
            let table = std::fs::read(&output.run.base)?;
            write_atomic(&output.run.jar, &write_archive(TINY_ARCHIVE_PATH, &table)?)?;
        }

        output.has_params = output.run.params.exists();
        Ok(output)
    }

    fn build(&self, run: StackRun) -> Result<StackOutput, StackError> {
        let sources = classify_all(&self.config.sources)?;
        let finish = |run: StackRun, outcome: StackOutcome, stats: MergeStats| StackOutput {
            run,
            outcome,
            has_params: false,
            stats,
        };

        let mut intermediaries: Option<MappingModel> = None;
        if self.config.use_intermediaries {
            match intermediary_supplier(&sources, &run.target_version) {
                Some(supplier) if sources.len() == 1 => {
                    tracing::info!("extracting {}", supplier.path().display());
                    self.extract(supplier, &run)?;
                    return Ok(finish(run, StackOutcome::Extracted, MergeStats::default()));
                }
                Some(supplier) => {
                    tracing::info!("loading intermediaries {}", supplier.path().display());
                    let model = self
                        .load(supplier, OFFICIAL, INTERMEDIARY)
                        .map_err(|e| StackError::missing_intermediary(&run.target_version, e))?;
                    intermediaries = Some(model);
                }
                None => {
                    self.ensure_intermediary(&run.intermediary, &run.target_version)?;
                    if sources.is_empty() {
                        self.duplicate_intermediary(&run)?;
                        return Ok(finish(run, StackOutcome::Duplicated, MergeStats::default()));
                    }
                    let model = read_intermediary(&run.intermediary, &run.target_version)?;
                    intermediaries = Some(model);
                }
            }
        } else if sources.is_empty() {
            return Err(StackError::config(
                "nothing to build: no sources and intermediaries disabled",
            ));
        }

        let inversion = intermediaries
            .as_ref()
            .map(|model| model.invert(InvertScope::Members));
        let (accumulator, stats) =
            self.accumulate(&sources, &run, intermediaries.as_ref(), inversion.as_ref())?;

        tracing::info!("combining mappings");
        let renamed;
        let view = match (&intermediaries, &inversion) {
            (Some(intermediaries), Some(inversion)) => {
                renamed = accumulator.rename_through(inversion);
                CombinedMappings::new(&renamed, intermediaries)
            }
            _ => CombinedMappings::new(&accumulator, &accumulator),
        };

        if view.has_args() {
            tracing::info!("writing {}", file_name(&run.params));
            let params = ParameterNames::from_combined(view);
            write_atomic(&run.params, params.render().as_bytes())?;
        }

        tracing::info!("writing {}", file_name(&run.base));
        let table = write_tiny(&view, &[OFFICIAL, NAMED, INTERMEDIARY], WriteMode::Compact)?;
        write_atomic(&run.base, &table)?;

        if !run.known && sources.len() > 1 {
            if let Some(path) = &run.history {
                let entries: Vec<String> =
                    sources.iter().map(|s| s.source.history_entry()).collect();
                StackHistory::new(path).record(&run.version, &entries)?;
            }
        }

        Ok(finish(run, StackOutcome::Merged, stats))
    }

    /// Merge every source, in priority order, into one intermediary → named
    /// model (official → named without intermediaries).
    fn accumulate(
        &self,
        sources: &[ClassifiedSource],
        run: &StackRun,
        intermediaries: Option<&MappingModel>,
        inversion: Option<&MappingModel>,
    ) -> Result<(MappingModel, MergeStats), StackError> {
        let conventions = self.config.conventions.compile()?;
        let frame = if intermediaries.is_some() { INTERMEDIARY } else { OFFICIAL };

        let mut accumulator = MappingModel::between(frame, NAMED);
        let mut renamers: FxHashMap<String, MappingModel> = FxHashMap::default();
        let mut total = MergeStats::default();

        for source in sources {
            tracing::info!("loading {}", file_name(source.path()));
            let (mut gains, native) = self.decode(source, &conventions)?;

            if let Some(lookup) = &self.descriptors {
                let resolved = gains.resolve_field_descriptors(|key| lookup.field_descriptor(key));
                tracing::debug!(resolved, "resolved field descriptors");
            }

            if let (true, Some(intermediaries)) = (native, intermediaries) {
                let target = source.source.target_version.as_str();
                let renamer = if target == run.target_version {
                    intermediaries
                } else {
                    self.renamer(&mut renamers, target)?
                };
                gains = gains.rename_through(renamer);
            }

            let filter = inversion
                .map(|model| {
                    MergeFilter::new(model).with_class_filtering(self.config.filter_classes)
                });
            let stats = accumulator.merge(&gains, filter);
            tracing::debug!(
                source = %source.source.history_entry(),
                classes = stats.classes,
                methods = stats.methods,
                fields = stats.fields,
                args = stats.args,
                filtered = stats.filtered,
                "merged"
            );

            total.classes += stats.classes;
            total.methods += stats.methods;
            total.fields += stats.fields;
            total.args += stats.args;
            total.filtered += stats.filtered;
        }

        Ok((accumulator, total))
    }

    /// Decode a source into its own frame. The flag is true when that frame
    /// is the official namespace rather than the intermediary one.
    fn decode(
        &self,
        source: &ClassifiedSource,
        conventions: &CompiledConventions,
    ) -> Result<(MappingModel, bool), StackError> {
        match source.format {
            ResolvedFormat::TinyV1 | ResolvedFormat::TinyV2 | ResolvedFormat::TinyGz => {
                let anchored = self.config.use_intermediaries && source.has_namespace(INTERMEDIARY);
                let origin = if anchored { INTERMEDIARY } else { OFFICIAL };
                Ok((self.load(source, origin, NAMED)?, !anchored))
            }
            ResolvedFormat::Enigma => {
                let mut gains = self.load(source, OFFICIAL, NAMED)?;
                let anchored = gains.par_classes().any(|c| conventions.is_main_class(&c.from));
                if anchored {
                    check_consistency(&gains, conventions)?;
                    gains.from_namespace = Some(Name::new(INTERMEDIARY));
                }
                Ok((gains, !anchored))
            }
        }
    }

    fn load(
        &self,
        source: &ClassifiedSource,
        from: &str,
        to: &str,
    ) -> Result<MappingModel, StackError> {
        let model = match &self.cache {
            Some(cache) => {
                let shared = cache.get_or_load(source.path(), from, to, || source.read(from, to))?;
                Arc::unwrap_or_clone(shared)
            }
            None => source.read(from, to)?,
        };
        Ok(model)
    }

    /// The intermediary table of another raw-namespace version, fetched
    /// into that version's cache directory on first use.
    fn renamer<'r>(
        &self,
        renamers: &'r mut FxHashMap<String, MappingModel>,
        version: &str,
    ) -> Result<&'r MappingModel, StackError> {
        match renamers.entry(version.to_string()) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let path = self.config.version_dir(version).join(INTERMEDIARY_FILE);
                self.ensure_intermediary(&path, version)?;
                Ok(entry.insert(read_intermediary(&path, version)?))
            }
        }
    }

    fn ensure_intermediary(&self, path: &Path, version: &str) -> Result<(), StackError> {
        if path.exists() {
            tracing::info!("loading intermediaries {}", file_name(path));
            return Ok(());
        }

        tracing::info!("downloading intermediaries {}", file_name(path));
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let temp = temp_sibling(path);
        let fetched = self
            .provider
            .fetch(version, &temp)
            .and_then(|()| std::fs::rename(&temp, path).map_err(StackError::from));
        if let Err(e) = fetched {
            let _ = std::fs::remove_file(&temp);
            return Err(match e {
                e @ StackError::MissingIntermediary { .. } => e,
                other => StackError::missing_intermediary(version, other),
            });
        }
        Ok(())
    }

    fn duplicate_intermediary(&self, run: &StackRun) -> Result<(), StackError> {
        let text = read_text(&run.intermediary)
            .map_err(|e| StackError::missing_intermediary(&run.target_version, e))?;
        let first = text.lines().next().unwrap_or_default();
        let flat = if TinyHeader::parse(first)?.is_v2() {
            tiny_v2_to_v1(&text)?.table
        } else {
            text
        };

        tracing::info!("writing {}", file_name(&run.base));
        let table = duplicate_column(&flat, INTERMEDIARY, NAMED)?;
        write_atomic(&run.base, table.as_bytes())
    }

    /// Copy a lone supplier source as the base table, flattening v2 tables.
    fn extract(&self, source: &ClassifiedSource, run: &StackRun) -> Result<(), StackError> {
        let nested = match source.format {
            ResolvedFormat::TinyV1 => false,
            ResolvedFormat::TinyV2 => true,
            ResolvedFormat::TinyGz => source.header.as_ref().is_some_and(TinyHeader::is_v2),
            ResolvedFormat::Enigma => {
                return Err(StackError::UnknownFormat {
                    path: source.path().to_path_buf(),
                });
            }
        };

        let text = read_text(source.path())?;
        if !nested {
            return write_atomic(&run.base, text.as_bytes());
        }

        let downgraded = tiny_v2_to_v1(&text)?;
        if !downgraded.params.is_empty() {
            tracing::info!("writing {}", file_name(&run.params));
            write_atomic(&run.params, downgraded.params.render().as_bytes())?;
        }
        write_atomic(&run.base, downgraded.table.as_bytes())
    }
}

fn read_intermediary(path: &Path, version: &str) -> Result<MappingModel, StackError> {
    read_text(path)
        .and_then(|text| read_tiny(&text, OFFICIAL, INTERMEDIARY))
        .map_err(|e| StackError::missing_intermediary(version, e))
}

/// Reject an intermediary-anchored source that names identifiers outside
/// the intermediary convention.
fn check_consistency(
    model: &MappingModel,
    conventions: &CompiledConventions,
) -> Result<(), StackError> {
    let classes: Vec<String> = model
        .par_classes()
        .filter(|c| c.to().is_some() && !conventions.is_class(&c.from))
        .map(|c| c.from.to_string())
        .collect();
    if !classes.is_empty() {
        return Err(StackError::Consistency {
            kind: "class",
            names: classes,
        });
    }

    let methods: Vec<String> = model
        .par_classes()
        .flat_map_iter(|c| c.methods())
        .filter(|m| {
            m.name()
                .is_some_and(|to| {
                    !conventions.is_method(&m.from_name) && to != m.from_name.as_str()
                })
        })
        .map(|m| format!("{}{}", m.from_name, m.from_desc))
        .collect();
    if !methods.is_empty() {
        return Err(StackError::Consistency {
            kind: "method",
            names: methods,
        });
    }

    let fields: Vec<String> = model
        .par_classes()
        .flat_map_iter(|c| c.fields())
        .filter(|f| f.name().is_some() && !conventions.is_field(&f.from_name))
        .map(|f| f.from_name.to_string())
        .collect();
    if !fields.is_empty() {
        return Err(StackError::Consistency {
            kind: "field",
            names: fields,
        });
    }

    Ok(())
}

// ── Artifact persistence ────────────────────────────────────────────

/// A uuid-named scratch path next to `path`.
pub(crate) fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{name}.{}.tmp", uuid::Uuid::new_v4()))
}

/// Write `content` to a scratch sibling and move it over `path`.
pub(crate) fn write_atomic(path: &Path, content: &[u8]) -> Result<(), StackError> {
    let temp = temp_sibling(path);
    let written = std::fs::write(&temp, content).and_then(|()| std::fs::rename(&temp, path));
    if let Err(e) = written {
        let _ = std::fs::remove_file(&temp);
        return Err(e.into());
    }
    Ok(())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
