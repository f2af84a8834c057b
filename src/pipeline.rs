//! Source rendering: preprocessing, link roles and directives applied to
//! each page, and the parallel driver over a whole source tree.

use indexmap::IndexMap;
use log::{debug, error, info};
use rayon::prelude::*;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::config::DocsConfig;
use crate::directives::{DirectiveContext, DirectiveRegistry};
use crate::error::{DocsError, Result};
use crate::highlight::Highlighter;
use crate::matching::{self, SourceDoc};
use crate::preprocess::Preprocessor;
use crate::roles::RoleResolver;
use crate::style::Style;
use crate::theme::{header_links, HeaderLink, ThemeRegistry};

/// Outcome of [`Pipeline::render_tree`].
#[derive(Debug, Clone, Default)]
pub struct RenderStats {
    pub files_processed: usize,
    pub files_failed: usize,
    pub build_time: Duration,
    pub output_bytes: u64,
    /// `(docname, message)` for every document that failed.
    pub error_details: Vec<(String, String)>,
}

/// Everything needed to render pages of one documentation site.
pub struct Pipeline {
    config: DocsConfig,
    preprocessor: Preprocessor,
    roles: RoleResolver,
    directives: DirectiveRegistry,
    highlighter: Highlighter,
    theme_options: IndexMap<String, Value>,
    header_links: Vec<HeaderLink>,
    parallel_jobs: usize,
}

impl Pipeline {
    /// Set up the pipeline for the site configured in `confdir`. Theme
    /// options are validated here so a bad configuration fails before any
    /// page is rendered.
    pub fn new(config: DocsConfig, confdir: &Path) -> Result<Self> {
        config.validate()?;

        let themes = ThemeRegistry::for_config(&config, confdir);
        let theme_options = themes.resolve_options(&config.html_theme, &config.html_theme_options)?;
        let header_links = header_links(&theme_options)?;

        let parallel_jobs = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);

        Ok(Self {
            preprocessor: Preprocessor::new(&config, confdir),
            roles: RoleResolver::from_config(&config, confdir),
            directives: DirectiveRegistry::with_builtin_handlers(),
            highlighter: Highlighter::new(),
            theme_options,
            header_links,
            parallel_jobs,
            config,
        })
    }

    pub fn with_parallel_jobs(mut self, jobs: usize) -> Self {
        self.parallel_jobs = jobs.max(1);
        self
    }

    pub fn config(&self) -> &DocsConfig {
        &self.config
    }

    pub fn theme_options(&self) -> &IndexMap<String, Value> {
        &self.theme_options
    }

    pub fn header_links(&self) -> &[HeaderLink] {
        &self.header_links
    }

    pub fn directives(&self) -> &DirectiveRegistry {
        &self.directives
    }

    /// Render one page: template and prolog, then link roles, then
    /// directives.
    pub fn render_source(&self, docname: &str, text: &str) -> Result<String> {
        let text = self.preprocessor.process(docname, text)?;
        let text = self.roles.expand(&text, docname);
        let mut context =
            DirectiveContext::new(&self.highlighter, &self.config.highlight_language, docname);
        Ok(self.directives.expand(&text, &mut context))
    }

    fn render_file(&self, srcdir: &Path, outdir: &Path, doc: &SourceDoc) -> Result<u64> {
        let source_path = srcdir.join(&doc.path);
        let text = std::fs::read_to_string(&source_path)
            .map_err(|e| DocsError::io(&source_path, e))?;
        let rendered = self.render_source(&doc.docname, &text)?;

        let target = outdir.join(&doc.path);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent).map_err(|e| DocsError::io(parent, e))?;
        }
        std::fs::write(&target, &rendered).map_err(|e| DocsError::io(&target, e))?;
        debug!("rendered {} -> {}", doc.docname, target.display());
        Ok(rendered.len() as u64)
    }

    /// Render every source document under `srcdir` into `outdir`, mirroring
    /// the tree, and write the highlighting stylesheet to
    /// `_static/pygments.css`. A failing document is logged and counted; the
    /// remaining documents are still rendered.
    pub fn render_tree(&self, srcdir: &Path, outdir: &Path) -> Result<RenderStats> {
        let start_time = Instant::now();
        info!("Rendering {} into {}", srcdir.display(), outdir.display());

        std::fs::create_dir_all(outdir).map_err(|e| DocsError::io(outdir, e))?;
        let canonical_output = outdir.canonicalize().ok();

        let docs: Vec<SourceDoc> = matching::collect_sources(srcdir, &self.config)?
            .into_iter()
            .filter(|doc| {
                let inside_output = canonical_output.as_ref().is_some_and(|output| {
                    srcdir
                        .join(&doc.path)
                        .canonicalize()
                        .map(|path| path.starts_with(output))
                        .unwrap_or(false)
                });
                if inside_output {
                    debug!("skipping {} inside the output directory", doc.docname);
                }
                !inside_output
            })
            .collect();
        info!("Discovered {} source files", docs.len());

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.parallel_jobs)
            .build()
            .map_err(|e| DocsError::Config(format!("cannot start worker pool: {}", e)))?;
        let results: Vec<(String, Result<u64>)> = pool.install(|| {
            docs.par_iter()
                .map(|doc| (doc.docname.clone(), self.render_file(srcdir, outdir, doc)))
                .collect()
        });

        let mut stats = RenderStats::default();
        for (docname, result) in results {
            match result {
                Ok(bytes) => {
                    stats.files_processed += 1;
                    stats.output_bytes += bytes;
                }
                Err(e) => {
                    error!("{}: {}", docname, e);
                    stats.files_failed += 1;
                    stats.error_details.push((docname, e.to_string()));
                }
            }
        }

        stats.output_bytes += self.write_stylesheet(outdir)?;
        stats.build_time = start_time.elapsed();
        info!(
            "Rendered {} documents ({} failed) in {:?}",
            stats.files_processed, stats.files_failed, stats.build_time
        );
        Ok(stats)
    }

    fn write_stylesheet(&self, outdir: &Path) -> Result<u64> {
        let style = Style::by_name(&self.config.pygments_style).ok_or_else(|| {
            DocsError::Config(format!("unknown pygments_style '{}'", self.config.pygments_style))
        })?;
        let css = style.css(".highlight");
        let static_dir: PathBuf = outdir.join("_static");
        std::fs::create_dir_all(&static_dir).map_err(|e| DocsError::io(&static_dir, e))?;
        let path = static_dir.join("pygments.css");
        std::fs::write(&path, &css).map_err(|e| DocsError::io(&path, e))?;
        Ok(css.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn site() -> TempDir {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("_templates")).unwrap();
        std::fs::write(
            dir.path().join("_templates/global-macros.inc"),
            "{% macro version() %}4.2{% endmacro %}",
        )
        .unwrap();
        std::fs::write(dir.path().join("global.rst"), ".. |inet| replace:: INET\n").unwrap();
        dir
    }

    #[test]
    fn test_render_source_runs_all_stages() {
        let dir = site();
        let pipeline = Pipeline::new(DocsConfig::default(), dir.path()).unwrap();
        let text = ":orphan:\n\nINET {{ opp.version() }} and :wiki:`OMNeT++`\n\n\
                    .. youtube:: abc\n";
        let out = pipeline.render_source("index", text).unwrap();
        assert!(out.starts_with(":orphan:\n\n.. |inet| replace:: INET\n\n"));
        assert!(out.contains("INET 4.2 and `OMNeT++ <https://en.wikipedia.org/wiki/OMNeT++>`__"));
        assert!(out.contains("https://www.youtube.com/embed/abc"));
    }

    #[test]
    fn test_invalid_theme_option_fails_setup() {
        let dir = site();
        let mut config = DocsConfig::default();
        config
            .html_theme_options
            .insert("primary_color".to_string(), Value::from("magenta"));
        assert!(matches!(
            Pipeline::new(config, dir.path()),
            Err(DocsError::Theme(_))
        ));
    }

    #[test]
    fn test_render_tree() {
        let dir = site();
        let src = dir.path();
        std::fs::create_dir_all(src.join("showcases")).unwrap();
        std::fs::write(src.join("index.rst"), "Index\n=====\n").unwrap();
        std::fs::write(
            src.join("showcases/video.rst"),
            ".. video:: media/demo.mp4\n   :loop:\n",
        )
        .unwrap();
        std::fs::write(src.join("showcases/broken.rst"), "{% if %}\n").unwrap();

        let out = TempDir::new().unwrap();
        let pipeline = Pipeline::new(DocsConfig::default(), src)
            .unwrap()
            .with_parallel_jobs(2);
        let stats = pipeline.render_tree(src, out.path()).unwrap();

        assert_eq!(stats.files_processed, 2);
        assert_eq!(stats.files_failed, 1);
        assert_eq!(stats.error_details[0].0, "showcases/broken");
        let video = std::fs::read_to_string(out.path().join("showcases/video.rst")).unwrap();
        assert!(video.contains("<video class=\"video\" controls loop>"));
        assert!(out.path().join("_static/pygments.css").is_file());
        assert!(!out.path().join("global.rst").exists());
    }
}
