//! Starter contents for freshly created pass files.

use anyhow::Result;
use minijinja::{Environment, context};

use crate::pass::FileKind;

const NEW_PASS_TEMPLATE: &str = include_str!("templates/new_pass.jinja");

/// Template engine wrapper around minijinja.
pub struct PassTemplates {
    env: Environment<'static>,
}

impl PassTemplates {
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.set_keep_trailing_newline(true);
        env.add_template("new_pass", NEW_PASS_TEMPLATE)
            .expect("new pass template should be valid");
        Self { env }
    }

    /// Header and an empty rule region for a new `.pat` or `.rec` file.
    pub fn render_new_pass(&self, kind: FileKind, name: &str, subject: &str) -> Result<String> {
        let template = self.env.get_template("new_pass")?;
        let rendered = template.render(context! {
            file_name => kind.file_name(name),
            subject => subject.trim(),
            kind => kind.keyword(),
        })?;
        Ok(rendered)
    }
}

impl Default for PassTemplates {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_rule_file_header() {
        let text = PassTemplates::new()
            .render_new_pass(FileKind::Pat, "dates", "Find dates")
            .expect("render");
        assert!(text.contains("# FILE: dates.pat"));
        assert!(text.contains("# SUBJ: Find dates"));
        assert!(text.contains("@NODES _ROOT"));
        assert!(!text.contains("@RECURSE"));
        assert!(text.ends_with("@@\n"));
    }

    #[test]
    fn renders_record_file_header() {
        let text = PassTemplates::new()
            .render_new_pass(FileKind::Rec, "lists", "")
            .expect("render");
        assert!(text.contains("# FILE: lists.rec"));
        assert!(text.contains("@RECURSE listarg"));
    }
}
