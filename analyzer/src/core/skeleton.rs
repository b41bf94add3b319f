//! Rule skeletons synthesized from a run of tree-log nodes.

use crate::core::formatter::{FormatOptions, format_rule};
use crate::core::tree_log::TreeNode;

/// Node name used in the rule envelope when none is configured.
pub const DEFAULT_NODE_NAME: &str = "_newNode";

/// One body line per shallowest sibling of the selection.
///
/// Nodes nested under an already emitted node (same or smaller `raw_end`) and
/// nodes deeper than the shallowest indent seen so far are skipped.
pub fn rule_from_nodes(nodes: &[&TreeNode]) -> String {
    let mut body = String::new();
    let mut min_indent = usize::MAX;
    let mut last_end: Option<usize> = None;
    let mut count = 0;
    for node in nodes {
        min_indent = min_indent.min(node.indent);
        if node.indent > min_indent || last_end.is_some_and(|end| node.raw_end <= end) {
            continue;
        }
        last_end = Some(node.raw_end);
        count += 1;
        body.push_str(&format!("\t{}\t### ({count})\n", element_for(node)));
    }
    body
}

/// Placeholder class or literal for one node.
pub fn element_for(node: &TreeNode) -> String {
    let first_upper = node.label.chars().next().is_some_and(char::is_uppercase);
    match node.token_type.as_str() {
        "alpha" if first_upper => "_xCAP".to_string(),
        "alpha" => "_xALPHA".to_string(),
        "white" => "_xWHITE".to_string(),
        "num" => "_xNUM".to_string(),
        "punct" => escape_literal(&node.label),
        _ if node.label.chars().count() == 1 => escape_literal(&node.label),
        _ => node.label.clone(),
    }
}

/// Backslash-escape every character that is not alphanumeric or `_`.
pub fn escape_literal(text: &str) -> String {
    let mut out = String::with_capacity(text.len() * 2);
    for c in text.chars() {
        if !(c.is_alphanumeric() || c == '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Wrap a formatted body in the `@RULES` envelope.
pub fn render_rule(node_name: &str, body: &str) -> String {
    format!("@RULES\n{node_name} <-\n{body}\t@@\n")
}

/// Full rule text for the selected nodes, or `None` when nothing is emitted.
pub fn generate_rule(nodes: &[&TreeNode], node_name: &str, options: FormatOptions) -> Option<String> {
    let body = rule_from_nodes(nodes);
    if body.is_empty() {
        return None;
    }
    Some(render_rule(node_name, &format_rule(&body, options)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::tree_log::parse_tree_log;

    const LOG: &str = "  _company[0,11,0,15,4,3,_company,fired,built]
    Acme[0,3,2,5,0,0,alpha]
    [4,4,6,6,0,0,white]
    corp[5,8,7,10,0,0,alpha]
  ,[12,12,16,16,0,0,punct]
  [13,13,17,17,0,0,white]
  42[14,15,18,19,0,0,num]
";

    #[test]
    fn emits_shallowest_siblings_only() {
        let nodes = parse_tree_log(LOG);
        let refs: Vec<&TreeNode> = nodes.iter().collect();
        assert_eq!(
            rule_from_nodes(&refs),
            "\t_company\t### (1)\n\t\\,\t### (2)\n\t_xWHITE\t### (3)\n\t_xNUM\t### (4)\n"
        );
    }

    #[test]
    fn selection_inside_a_node_uses_its_children() {
        let nodes = parse_tree_log(LOG);
        let refs: Vec<&TreeNode> = nodes[1..4].iter().collect();
        assert_eq!(
            rule_from_nodes(&refs),
            "\t_xCAP\t### (1)\n\t_xWHITE\t### (2)\n\t_xALPHA\t### (3)\n"
        );
    }

    #[test]
    fn escapes_punctuation() {
        assert_eq!(escape_literal("."), "\\.");
        assert_eq!(escape_literal("a-b"), "a\\-b");
        assert_eq!(escape_literal("x_1"), "x_1");
    }

    #[test]
    fn generated_rule_has_envelope_and_alignment() {
        let nodes = parse_tree_log(LOG);
        let refs: Vec<&TreeNode> = nodes[1..4].iter().collect();
        let rule = generate_rule(&refs, DEFAULT_NODE_NAME, FormatOptions::default())
            .expect("rule");
        assert_eq!(
            rule,
            "@RULES\n_newNode <-\n\t_xCAP\t### (1)\n\t_xWHITE\t### (2)\n\t_xALPHA\t### (3)\n\t@@\n"
        );
    }

    #[test]
    fn empty_selection_yields_nothing() {
        assert_eq!(generate_rule(&[], DEFAULT_NODE_NAME, FormatOptions::default()), None);
    }
}
