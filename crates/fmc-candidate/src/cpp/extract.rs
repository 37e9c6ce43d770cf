//! C++ type extraction
//!
//! Walks a tree-sitter-cpp syntax tree and records every class or struct
//! definition as a [`TypeDescriptor`]: bases from the base clause, methods
//! with arity, return shape, `= 0` and `override`, and whether a public
//! constructor exists. `using` and `typedef` aliases are kept so is-a queries
//! see through re-exported names. Syntax errors are recorded as diagnostics;
//! extraction carries on with whatever the parser recovered.

use crate::descriptor::{unqualified, CandidateModel, OperationDescriptor, TypeDescriptor};
use fmc_contract::ReturnKind;
use tree_sitter::{Node, Parser, Tree};

/// Maximum syntax errors recorded per source
const MAX_SYNTAX_DIAGNOSTICS: usize = 8;

/// Extraction errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractError {
    /// The C++ grammar could not be loaded into the parser
    #[error("parser initialization failed: {0}")]
    ParserInit(String),

    /// The parser gave up without producing a tree
    #[error("parse failed")]
    ParseFailed,
}

/// Member access inside a class body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Access {
    Public,
    Protected,
    Private,
}

impl Access {
    fn parse(text: &str) -> Self {
        match text.trim().trim_end_matches(':').trim() {
            "public" => Access::Public,
            "protected" => Access::Protected,
            _ => Access::Private,
        }
    }
}

/// What a class-body declaration turned out to be
enum Member {
    Operation(OperationDescriptor),
    Constructor { deleted: bool },
}

fn parse(source: &str) -> Result<Tree, ExtractError> {
    let language: tree_sitter::Language = tree_sitter_cpp::LANGUAGE.into();
    let mut parser = Parser::new();
    parser
        .set_language(&language)
        .map_err(|e| ExtractError::ParserInit(e.to_string()))?;
    parser.parse(source, None).ok_or(ExtractError::ParseFailed)
}

/// Build a candidate model from C++ source
pub fn extract_model(source: &str) -> Result<CandidateModel, ExtractError> {
    let mut model = CandidateModel::new();
    extract_into(&mut model, source, None)?;
    Ok(model)
}

/// Add the types of one file to `model`
///
/// `origin` names the file in diagnostics.
pub fn extract_into(
    model: &mut CandidateModel,
    source: &str,
    origin: Option<&str>,
) -> Result<(), ExtractError> {
    let tree = parse(source)?;
    let root = tree.root_node();
    let types_before = model.len();

    if root.has_error() {
        let mut found = 0;
        collect_syntax_errors(root, origin, model, &mut found);
    }
    visit(root, source, model);

    tracing::debug!(
        origin = origin.unwrap_or("<inline>"),
        types = model.len() - types_before,
        diagnostics = model.diagnostics().len(),
        "extracted C++ types"
    );
    Ok(())
}

/// Check if `source` defines a global `main` function
#[must_use]
pub fn defines_main(source: &str) -> bool {
    let Ok(tree) = parse(source) else {
        return false;
    };
    let found = children(tree.root_node()).into_iter().any(|node| {
        node.kind() == "function_definition"
            && node
                .child_by_field_name("declarator")
                .and_then(unwrap_declarator)
                .and_then(|(function, _)| function.child_by_field_name("declarator"))
                .is_some_and(|name| name.kind() == "identifier" && text(name, source) == "main")
    });
    found
}

fn visit(node: Node<'_>, source: &str, model: &mut CandidateModel) {
    match node.kind() {
        "class_specifier" | "struct_specifier" => {
            if let Some(descriptor) = extract_type(node, source) {
                model.insert(descriptor);
            }
            if let Some(body) = node.child_by_field_name("body") {
                for child in children(body) {
                    visit(child, source, model);
                }
            }
            return;
        }
        "alias_declaration" => {
            if let (Some(name), Some(target)) = (
                node.child_by_field_name("name"),
                node.child_by_field_name("type"),
            ) {
                model.insert_alias(text(name, source), unqualified(text(target, source)));
            }
            return;
        }
        "type_definition" => {
            if let Some(target) = node.child_by_field_name("type") {
                let target_name = type_name_of(target, source);
                for alias in children(node) {
                    if alias.kind() == "type_identifier" && alias.id() != target.id() {
                        if let Some(target_name) = target_name.as_deref() {
                            model.insert_alias(text(alias, source), target_name);
                        }
                    }
                }
            }
        }
        _ => {}
    }

    for child in children(node) {
        visit(child, source, model);
    }
}

/// Name of a type node, also for `typedef struct X {...} Y;`
fn type_name_of(node: Node<'_>, source: &str) -> Option<String> {
    match node.kind() {
        "class_specifier" | "struct_specifier" => node
            .child_by_field_name("name")
            .map(|n| unqualified(text(n, source)).to_string()),
        _ => Some(unqualified(text(node, source)).to_string()).filter(|n| !n.is_empty()),
    }
}

fn extract_type(node: Node<'_>, source: &str) -> Option<TypeDescriptor> {
    let body = node.child_by_field_name("body")?;
    let name = unqualified(text(node.child_by_field_name("name")?, source)).to_string();
    if name.is_empty() {
        return None;
    }

    let mut descriptor = TypeDescriptor::new(name.clone()).at_line(node.start_position().row + 1);

    for clause in children(node).into_iter().filter(|c| c.kind() == "base_class_clause") {
        for base in named_children(clause) {
            if matches!(
                base.kind(),
                "type_identifier" | "qualified_identifier" | "template_type"
            ) {
                descriptor.bases.push(unqualified(text(base, source)).to_string());
            }
        }
    }

    let mut access = if node.kind() == "class_specifier" {
        Access::Private
    } else {
        Access::Public
    };
    let mut declared_constructors = 0usize;
    let mut usable_constructors = 0usize;

    for member in children(body) {
        match member.kind() {
            "access_specifier" => access = Access::parse(text(member, source)),
            "field_declaration" | "declaration" | "function_definition" => {
                match classify_member(member, source, &name) {
                    Some(Member::Operation(operation)) => descriptor.operations.push(operation),
                    Some(Member::Constructor { deleted }) => {
                        declared_constructors += 1;
                        if access == Access::Public && !deleted {
                            usable_constructors += 1;
                        }
                    }
                    None => {}
                }
            }
            _ => {}
        }
    }

    if declared_constructors > 0 && usable_constructors == 0 {
        descriptor.explicit_abstract = true;
    }
    Some(descriptor)
}

fn classify_member(member: Node<'_>, source: &str, class_name: &str) -> Option<Member> {
    let declarator = member.child_by_field_name("declarator")?;
    let (function, indirect) = unwrap_declarator(declarator)?;
    let name_node = function.child_by_field_name("declarator")?;
    if !matches!(name_node.kind(), "field_identifier" | "identifier") {
        // destructors, operators, out-of-line qualified names
        return None;
    }
    let name = text(name_node, source);

    let Some(type_node) = member.child_by_field_name("type") else {
        if name == class_name {
            let deleted = has_child_kind(member, "delete_method_clause")
                || compact(text(member, source)).ends_with("=delete;");
            return Some(Member::Constructor { deleted });
        }
        return None;
    };

    let operation = OperationDescriptor {
        name: name.to_string(),
        arity: count_parameters(function, source),
        returns: classify_return(text(type_node, source), indirect),
        is_pure: is_pure_declaration(member, source),
        is_override: has_virtual_specifier(member, source) || has_virtual_specifier(function, source),
    };
    Some(Member::Operation(operation))
}

/// Strip pointer and reference declarators down to the function declarator
fn unwrap_declarator(mut node: Node<'_>) -> Option<(Node<'_>, bool)> {
    let mut indirect = false;
    for _ in 0..8 {
        match node.kind() {
            "function_declarator" => return Some((node, indirect)),
            "pointer_declarator" => {
                indirect = true;
                node = node.child_by_field_name("declarator")?;
            }
            "reference_declarator" => {
                node = named_children(node).into_iter().last()?;
            }
            _ => return None,
        }
    }
    None
}

fn count_parameters(function: Node<'_>, source: &str) -> usize {
    let Some(parameters) = function.child_by_field_name("parameters") else {
        return 0;
    };
    named_children(parameters)
        .into_iter()
        .filter(|p| {
            matches!(
                p.kind(),
                "parameter_declaration"
                    | "optional_parameter_declaration"
                    | "variadic_parameter_declaration"
            ) && text(*p, source).trim() != "void"
        })
        .count()
}

fn is_pure_declaration(member: Node<'_>, source: &str) -> bool {
    if member.kind() == "function_definition" && member.child_by_field_name("body").is_some() {
        return false;
    }
    if has_child_kind(member, "pure_virtual_clause") {
        return true;
    }
    if let Some(default) = member.child_by_field_name("default_value") {
        return text(default, source).trim() == "0";
    }
    compact(text(member, source)).ends_with("=0;")
}

fn has_virtual_specifier(node: Node<'_>, source: &str) -> bool {
    children(node).into_iter().any(|c| {
        c.kind() == "virtual_specifier" && matches!(text(c, source).trim(), "override" | "final")
    })
}

fn classify_return(type_text: &str, indirect: bool) -> ReturnKind {
    if indirect {
        return if type_text.contains("char") {
            ReturnKind::Text
        } else {
            ReturnKind::Object
        };
    }
    if type_text.contains("unique_ptr") || type_text.contains("shared_ptr") {
        ReturnKind::Object
    } else if type_text.contains("string") {
        ReturnKind::Text
    } else if type_text.trim() == "void" {
        ReturnKind::Void
    } else {
        ReturnKind::Unknown
    }
}

fn collect_syntax_errors(
    node: Node<'_>,
    origin: Option<&str>,
    model: &mut CandidateModel,
    found: &mut usize,
) {
    if *found >= MAX_SYNTAX_DIAGNOSTICS {
        return;
    }
    if node.is_error() || node.is_missing() {
        let position = node.start_position();
        let at = format!("line {}, column {}", position.row + 1, position.column + 1);
        model.push_diagnostic(match origin {
            Some(origin) => format!("{origin}: syntax error at {at}"),
            None => format!("syntax error at {at}"),
        });
        *found += 1;
        return;
    }
    for child in children(node) {
        collect_syntax_errors(child, origin, model, found);
    }
}

fn has_child_kind(node: Node<'_>, kind: &str) -> bool {
    children(node).into_iter().any(|c| c.kind() == kind)
}

fn children(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    node.children(&mut cursor).collect()
}

fn named_children(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor).collect()
}

fn text<'s>(node: Node<'_>, source: &'s str) -> &'s str {
    node.utf8_text(source.as_bytes()).unwrap_or("")
}

fn compact(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}
