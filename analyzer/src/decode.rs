//! Decoding of engine output for `analyzer decode`.
//!
//! Every request re-reads the artifacts from disk. A missing artifact means
//! the pass has not run for that input yet and yields `Ok(None)`.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::core::markers::{
    HighlightRange, find_match_by_absolute, offset_to_position, parse_highlights,
    raw_to_annotated, selection_to_raw,
};
use crate::core::skeleton::generate_rule;
use crate::core::tree_log::{
    FiredSpan, TreeNode, find_fired, nodes_within, parse_fireds, parse_tree_log,
};
use crate::core::types::{Position, RawSpan, Selection};
use crate::io::artifacts::{ArtifactKind, artifact_path};
use crate::io::config::AnalyzerConfig;
use crate::io::init::AnalyzerPaths;
use crate::io::sequence_store::SequenceStore;
use crate::io::text_buffer::TextBuffer;

/// Pass resolved from an ordinal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PassRef {
    pub ordinal: usize,
    pub name: String,
    pub file: Option<PathBuf>,
}

/// What produced the text at one raw offset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpanOrigin {
    pub raw: usize,
    pub highlight: Option<HighlightRange>,
    pub fired: Option<FiredSpan>,
    /// Pass whose rule fired, when the fired record names one in the sequence.
    pub pass: Option<PassRef>,
}

/// A synthesized rule and where it was appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedRule {
    pub span: RawSpan,
    pub text: String,
    pub appended_to: Option<PathBuf>,
}

/// Explicit decode context for one analyzer directory.
#[derive(Debug, Clone)]
pub struct Decoder {
    paths: AnalyzerPaths,
    config: AnalyzerConfig,
}

impl Decoder {
    pub fn new(paths: AnalyzerPaths, config: AnalyzerConfig) -> Self {
        Self { paths, config }
    }

    /// Marker ranges of the highlight copy for `ordinal`, sorted by raw start.
    pub fn highlights(&self, input: &Path, ordinal: usize) -> Result<Option<Vec<HighlightRange>>> {
        let Some(buffer) = self.artifact(input, ordinal, ArtifactKind::Highlight)? else {
            return Ok(None);
        };
        self.parse_ranges(&buffer).map(Some)
    }

    /// Raw span of the input text designated by a selection in the highlight copy.
    #[instrument(skip(self))]
    pub fn map_selection_to_raw(
        &self,
        input: &Path,
        ordinal: usize,
        selection: Selection,
    ) -> Result<Option<RawSpan>> {
        let Some(buffer) = self.artifact(input, ordinal, ArtifactKind::Highlight)? else {
            return Ok(None);
        };
        self.parse_ranges(&buffer)?;
        let span = selection_to_raw(
            buffer.text(),
            selection,
            buffer.separator(),
            &self.config.markers(),
        );
        debug!(start = span.start, end = span.end, "selection mapped");
        Ok(Some(span))
    }

    /// Position in the highlight copy where raw offset `raw` is displayed.
    pub fn locate_raw(&self, input: &Path, ordinal: usize, raw: usize) -> Result<Option<Position>> {
        let Some(buffer) = self.artifact(input, ordinal, ArtifactKind::Highlight)? else {
            return Ok(None);
        };
        self.parse_ranges(&buffer)?;
        Ok(raw_to_annotated(buffer.text(), raw, &self.config.markers())
            .map(|offset| offset_to_position(buffer.text(), offset, buffer.separator())))
    }

    /// Highlight, fired record and pass responsible for the text at `at`.
    #[instrument(skip(self))]
    pub fn find_span_at(
        &self,
        input: &Path,
        ordinal: usize,
        at: Position,
    ) -> Result<Option<SpanOrigin>> {
        let Some(buffer) = self.artifact(input, ordinal, ArtifactKind::Highlight)? else {
            return Ok(None);
        };
        let ranges = self.parse_ranges(&buffer)?;
        let raw = selection_to_raw(
            buffer.text(),
            Selection::caret(at),
            buffer.separator(),
            &self.config.markers(),
        )
        .start;
        let highlight = find_match_by_absolute(&ranges, raw).map(|idx| ranges[idx].clone());

        let fired = match self.artifact(input, ordinal, ArtifactKind::TreeLog)? {
            Some(log) => {
                let spans = parse_fireds(log.text(), self.config.highlight.mode);
                find_fired(&spans, raw).copied()
            }
            None => None,
        };
        let pass = match &fired {
            Some(span) => self.resolve_pass(span.pass_ordinal)?,
            None => None,
        };
        Ok(Some(SpanOrigin {
            raw,
            highlight,
            fired,
            pass,
        }))
    }

    /// Synthesize a rule from the tree nodes under a selection and, when
    /// `append` is set, add it to the end of the pass file for `ordinal`.
    #[instrument(skip(self))]
    pub fn generate_rule_skeleton(
        &self,
        input: &Path,
        ordinal: usize,
        selection: Selection,
        append: bool,
    ) -> Result<Option<GeneratedRule>> {
        let Some(span) = self.map_selection_to_raw(input, ordinal, selection)? else {
            return Ok(None);
        };
        let Some(log) = self.artifact(input, ordinal, ArtifactKind::TreeLog)? else {
            return Ok(None);
        };
        let nodes = parse_tree_log(log.text());
        let selected: Vec<&TreeNode> =
            nodes_within(&nodes, span.start, span.end.max(span.start + 1));
        let Some(text) = generate_rule(
            &selected,
            &self.config.rules.node_name,
            self.config.format_options(),
        ) else {
            return Ok(None);
        };

        let appended_to = if append {
            let pass = self
                .resolve_pass(ordinal)?
                .ok_or_else(|| anyhow!("no pass with ordinal {ordinal}"))?;
            let file = pass
                .file
                .ok_or_else(|| anyhow!("pass '{}' has no rule file", pass.name))?;
            append_rule(&file, &text)?;
            info!(file = %file.display(), "rule skeleton appended");
            Some(file)
        } else {
            None
        };
        Ok(Some(GeneratedRule {
            span,
            text,
            appended_to,
        }))
    }

    fn artifact(&self, input: &Path, ordinal: usize, kind: ArtifactKind) -> Result<Option<TextBuffer>> {
        let path = artifact_path(&self.paths.log_dir(input), ordinal, kind);
        let buffer = TextBuffer::load_if_exists(&path)?;
        if buffer.is_none() {
            debug!(path = %path.display(), "artifact not generated yet");
        }
        Ok(buffer)
    }

    fn parse_ranges(&self, buffer: &TextBuffer) -> Result<Vec<HighlightRange>> {
        parse_highlights(buffer.text(), &self.config.markers()).with_context(|| {
            let path = buffer
                .path()
                .map(|path| path.display().to_string())
                .unwrap_or_default();
            format!("parse highlights {path}")
        })
    }

    fn resolve_pass(&self, ordinal: usize) -> Result<Option<PassRef>> {
        let sequence = SequenceStore::new(self.paths.clone()).load()?;
        Ok(sequence.pass_for_ordinal(ordinal).map(|pass| PassRef {
            ordinal,
            name: pass.name().to_string(),
            file: pass
                .file_path()
                .filter(|_| !pass.is_missing())
                .map(Path::to_path_buf),
        }))
    }
}

fn append_rule(path: &Path, rule: &str) -> Result<()> {
    let existing = std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let mut file = OpenOptions::new()
        .append(true)
        .open(path)
        .with_context(|| format!("open {}", path.display()))?;
    let mut buf = String::new();
    if !existing.is_empty() && !existing.ends_with('\n') {
        buf.push('\n');
    }
    buf.push('\n');
    buf.push_str(rule);
    file.write_all(buf.as_bytes())
        .with_context(|| format!("append {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::DisplayMode;
    use crate::test_support::TestAnalyzer;

    const DESCRIPTOR: &str = "tokenize\tnil\t\npat\tcompany\t\npat\tprice\t\n";
    const INPUT: &str = "Acme corp, 42";
    const HIGHLIGHT: &str = "[[Acme corp]], {{42}}";
    const TREE_LOG: &str = "\
_ROOT[0,12,0,20,0,0,_ROOT]
  _company[0,8,0,12,2,3,_company,fired,built]
    Acme[0,3,2,5,0,0,alpha]
    [4,4,6,6,0,0,white]
    corp[5,8,7,10,0,0,alpha]
  ,[9,9,13,13,0,0,punct]
  [10,10,14,14,0,0,white]
  42[11,12,17,18,3,7,num,fired]
";

    fn fixture() -> TestAnalyzer {
        let analyzer = TestAnalyzer::new(DESCRIPTOR);
        analyzer.write_pass("company.pat", "@NODES _ROOT\n");
        analyzer.write_input("story.txt", INPUT);
        analyzer.write_artifact("story.txt", 2, ArtifactKind::Highlight, HIGHLIGHT);
        analyzer.write_artifact("story.txt", 2, ArtifactKind::TreeLog, TREE_LOG);
        analyzer
    }

    fn sel(start: (usize, usize), end: (usize, usize)) -> Selection {
        Selection::new(Position::new(start.0, start.1), Position::new(end.0, end.1))
    }

    #[test]
    fn missing_artifacts_yield_none() {
        let analyzer = fixture();
        let decoder = analyzer.decoder();
        let input = Path::new("story.txt");
        assert!(decoder.highlights(input, 3).expect("highlights").is_none());
        assert!(
            decoder
                .map_selection_to_raw(Path::new("other.txt"), 2, sel((0, 0), (0, 1)))
                .expect("map")
                .is_none()
        );
    }

    #[test]
    fn maps_selection_and_locates_back() {
        let analyzer = fixture();
        let decoder = analyzer.decoder();
        let input = Path::new("story.txt");
        let span = decoder
            .map_selection_to_raw(input, 2, sel((0, 2), (0, 11)))
            .expect("map")
            .expect("span");
        assert_eq!(span, RawSpan::new(0, 9));
        let chars: Vec<char> = INPUT.chars().collect();
        assert_eq!(chars[span.start..span.end].iter().collect::<String>(), "Acme corp");

        let at = decoder.locate_raw(input, 2, 11).expect("locate").expect("position");
        assert_eq!(at, Position::new(0, 17));
    }

    #[test]
    fn finds_origin_of_built_span() {
        let analyzer = fixture();
        let origin = analyzer
            .decoder()
            .find_span_at(Path::new("story.txt"), 2, Position::new(0, 7))
            .expect("find")
            .expect("origin");
        assert_eq!(origin.raw, 5);
        let highlight = origin.highlight.expect("highlight");
        assert_eq!((highlight.raw_start, highlight.raw_end), (0, 9));
        let fired = origin.fired.expect("fired");
        assert_eq!(fired.rule_line, 3);
        let pass = origin.pass.expect("pass");
        assert_eq!(pass.name, "company");
        assert!(pass.file.is_some());
    }

    #[test]
    fn built_mode_hides_unbuilt_matches() {
        let analyzer = fixture();
        let mut config = AnalyzerConfig::default();
        config.highlight.mode = DisplayMode::Built;
        let decoder = Decoder::new(analyzer.paths().clone(), config);
        let origin = decoder
            .find_span_at(Path::new("story.txt"), 2, Position::new(0, 17))
            .expect("find")
            .expect("origin");
        assert_eq!(origin.raw, 11);
        assert!(origin.highlight.is_some());
        assert!(origin.fired.is_none());

        let all = analyzer
            .decoder()
            .find_span_at(Path::new("story.txt"), 2, Position::new(0, 17))
            .expect("find")
            .expect("origin");
        let pass = all.pass.expect("pass");
        assert_eq!(pass.name, "price");
        assert_eq!(pass.file, None);
    }

    #[test]
    fn generates_and_appends_rule() {
        let analyzer = fixture();
        let rule = analyzer
            .decoder()
            .generate_rule_skeleton(Path::new("story.txt"), 2, sel((0, 2), (0, 15)), true)
            .expect("generate")
            .expect("rule");
        assert_eq!(rule.span, RawSpan::new(0, 11));
        assert_eq!(
            rule.text,
            "@RULES\n_newNode <-\n\t_company\t### (1)\n\t\\,\t\t\t### (2)\n\t_xWHITE\t\t### (3)\n\t@@\n"
        );
        let file = rule.appended_to.expect("appended");
        let contents = std::fs::read_to_string(file).expect("read");
        assert_eq!(contents, format!("@NODES _ROOT\n\n{}", rule.text));
    }

    #[test]
    fn whole_text_selection_skips_root() {
        let analyzer = fixture();
        let rule = analyzer
            .decoder()
            .generate_rule_skeleton(Path::new("story.txt"), 2, sel((0, 0), (0, 21)), false)
            .expect("generate")
            .expect("rule");
        assert_eq!(rule.span, RawSpan::new(0, 13));
        assert_eq!(
            rule.text,
            "@RULES\n_newNode <-\n\t_company\t### (1)\n\t\\,\t\t\t### (2)\n\t_xWHITE\t\t### (3)\n\t_xNUM\t\t### (4)\n\t@@\n"
        );
        assert_eq!(rule.appended_to, None);
    }

    #[test]
    fn malformed_markers_are_reported() {
        let analyzer = fixture();
        analyzer.write_artifact("story.txt", 2, ArtifactKind::Highlight, "[[Acme corp, 42");
        let err = analyzer
            .decoder()
            .highlights(Path::new("story.txt"), 2)
            .unwrap_err();
        assert!(format!("{err:#}").contains("never closed"));
    }
}
