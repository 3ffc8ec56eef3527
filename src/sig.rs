//! Tree-sitter based signature extraction for candidate code.
//!
//! Locates the primary callable in a snippet and recovers its declared
//! parameter types without executing anything. A parse miss is not an
//! error: `extract_signature` returns `None` and the caller leaves the
//! source unchanged.

use crate::defaults::normalize_type;
use crate::language::LanguageVariant;
use regex::Regex;
use std::cell::RefCell;
use std::sync::LazyLock;
use tree_sitter::{Node, Parser, Tree};

// ═══════════════════════════════════════════════════════════════════════════
//  THREAD-LOCAL PARSER POOL
// ═══════════════════════════════════════════════════════════════════════════
//
// Tree-sitter parsers are expensive to create but can be reused for many
// snippets of the same language, so each thread keeps one pre-configured
// parser per grammar.

thread_local! {
    static PYTHON_PARSER: RefCell<Parser> = RefCell::new({
        let mut p = Parser::new();
        // Ignore error here - will be caught at parse time if language fails
        let _ = p.set_language(&tree_sitter_python::LANGUAGE.into());
        p
    });

    static JS_PARSER: RefCell<Parser> = RefCell::new({
        let mut p = Parser::new();
        let _ = p.set_language(&tree_sitter_javascript::LANGUAGE.into());
        p
    });

    static JAVA_PARSER: RefCell<Parser> = RefCell::new({
        let mut p = Parser::new();
        let _ = p.set_language(&tree_sitter_java::LANGUAGE.into());
        p
    });

    static CPP_PARSER: RefCell<Parser> = RefCell::new({
        let mut p = Parser::new();
        let _ = p.set_language(&tree_sitter_cpp::LANGUAGE.into());
        p
    });
}

/// Parse a snippet with the pooled parser for the given variant.
/// `Unknown` has no grammar and yields `None`.
pub fn parse(code: &str, variant: LanguageVariant) -> Option<Tree> {
    match variant {
        LanguageVariant::Python => PYTHON_PARSER.with(|p| p.borrow_mut().parse(code, None)),
        LanguageVariant::JavaScript => JS_PARSER.with(|p| p.borrow_mut().parse(code, None)),
        LanguageVariant::Java => JAVA_PARSER.with(|p| p.borrow_mut().parse(code, None)),
        LanguageVariant::Cpp => CPP_PARSER.with(|p| p.borrow_mut().parse(code, None)),
        LanguageVariant::Unknown => None,
    }
}

/// The primary callable discovered in a snippet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallableSignature {
    pub name: String,
    pub parameters: Vec<ParameterType>,
}

/// One parameter's declared type, spacing-normalized. `None` means the
/// grammar carries no type information for it (JavaScript).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterType {
    pub declared: Option<String>,
}

impl ParameterType {
    fn typed(text: impl Into<String>) -> Self {
        Self {
            declared: Some(normalize_type(&text.into())),
        }
    }

    fn untyped() -> Self {
        Self { declared: None }
    }
}

pub fn node_text(node: Node<'_>, content: &str) -> String {
    content[node.start_byte()..node.end_byte()].to_string()
}

/// Depth-first search for the first node of a kind. Anonymous nodes are
/// included so declarator punctuation stays visible to callers.
pub fn first_descendant_of_kind<'t>(node: Node<'t>, kind: &str) -> Option<Node<'t>> {
    if node.kind() == kind {
        return Some(node);
    }
    for i in 0..node.child_count() {
        if let Some(child) = node.child(i) {
            if let Some(found) = first_descendant_of_kind(child, kind) {
                return Some(found);
            }
        }
    }
    None
}

/// Locate the first callable definition and its parameters.
///
/// Returns `None` when the grammar produces no function/method node; the
/// caller treats that as "nothing to wrap".
pub fn extract_signature(code: &str, variant: LanguageVariant) -> Option<CallableSignature> {
    let tree = parse(code, variant)?;
    let root = tree.root_node();

    match variant {
        LanguageVariant::Python => extract_python(root, code),
        LanguageVariant::JavaScript => extract_javascript(root, code),
        LanguageVariant::Java => extract_java(root, code),
        LanguageVariant::Cpp => extract_cpp(root, code),
        LanguageVariant::Unknown => None,
    }
}

fn extract_python(root: Node<'_>, content: &str) -> Option<CallableSignature> {
    let func = first_descendant_of_kind(root, "function_definition")?;

    let name = func
        .child_by_field_name("name")
        .map(|n| node_text(n, content))
        .unwrap_or_else(|| "func".to_string());

    let mut parameters = Vec::new();
    if let Some(params) = func.child_by_field_name("parameters") {
        for i in 0..params.named_child_count() {
            let Some(param) = params.named_child(i) else {
                continue;
            };
            // Annotated parameters expose a `type` field; bare names do
            // not, and an unannotated python parameter defaults to int.
            let declared = param
                .child_by_field_name("type")
                .map(|t| node_text(t, content))
                .unwrap_or_else(|| "int".to_string());
            parameters.push(ParameterType::typed(declared));
        }
    }

    Some(CallableSignature { name, parameters })
}

fn extract_javascript(root: Node<'_>, content: &str) -> Option<CallableSignature> {
    let func = first_descendant_of_kind(root, "function_declaration")?;

    let name = func
        .child_by_field_name("name")
        .map(|n| node_text(n, content))
        .unwrap_or_else(|| "func".to_string());

    let mut parameters = Vec::new();
    if let Some(params) = func.child_by_field_name("parameters") {
        for _ in 0..params.named_child_count() {
            parameters.push(ParameterType::untyped());
        }
    }

    Some(CallableSignature { name, parameters })
}

fn extract_java(root: Node<'_>, content: &str) -> Option<CallableSignature> {
    let method = first_descendant_of_kind(root, "method_declaration")?;

    let name = method
        .child_by_field_name("name")
        .map(|n| node_text(n, content))
        .unwrap_or_else(|| "func".to_string());

    let mut parameters = Vec::new();
    if let Some(params) = method.child_by_field_name("parameters") {
        for i in 0..params.named_child_count() {
            let Some(param) = params.named_child(i) else {
                continue;
            };
            let declared = param
                .child_by_field_name("type")
                .or_else(|| param.named_child(0))
                .map(|t| node_text(t, content))
                .unwrap_or_else(|| "int".to_string());
            parameters.push(ParameterType::typed(declared));
        }
    }

    Some(CallableSignature { name, parameters })
}

static PAREN_PARAMS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(([^)]*)\)").expect("valid regex"));

fn extract_cpp(root: Node<'_>, content: &str) -> Option<CallableSignature> {
    let func = first_descendant_of_kind(root, "function_definition")?;

    // The callable name lives inside the declarator subtree. For pointer-
    // returning declarators the declarator node is a pointer_declarator
    // wrapping the function_declarator, so take the first identifier token
    // found below it; the search never matches the `*` marker.
    let declarator = func.child_by_field_name("declarator");
    let name = declarator
        .and_then(|d| first_descendant_of_kind(d, "identifier"))
        .map(|n| node_text(n, content))
        .unwrap_or_else(|| "func".to_string());

    let mut parameters = Vec::new();
    if let Some(func_decl) = declarator.and_then(|d| first_descendant_of_kind(d, "function_declarator")) {
        if let Some(params) = func_decl.child_by_field_name("parameters") {
            for i in 0..params.named_child_count() {
                let Some(param) = params.named_child(i) else {
                    continue;
                };
                if param.kind() != "parameter_declaration" {
                    continue;
                }
                let mut tokens = Vec::new();
                collect_type_tokens(param, content, &mut tokens);
                parameters.push(ParameterType::typed(tokens.join(" ")));
            }
        }
    }

    // Regex fallback on structural zero-result: count the comma-separated
    // entries of the first parenthesized group and treat each as an int.
    if parameters.is_empty() {
        let func_text = node_text(func, content);
        if let Some(caps) = PAREN_PARAMS.captures(&func_text) {
            let inner = caps.get(1).map(|m| m.as_str().trim()).unwrap_or("");
            if !inner.is_empty() {
                let arity = inner.split(',').filter(|s| !s.trim().is_empty()).count();
                parameters = (0..arity).map(|_| ParameterType::typed("int")).collect();
            }
        }
    }

    Some(CallableSignature { name, parameters })
}

/// Gather the type-forming tokens of a C++ parameter declaration: type
/// names, qualifiers, and pointer/reference markers, in source order. The
/// walk stops at the outermost type node so nested template arguments are
/// not double-counted.
fn collect_type_tokens(node: Node<'_>, content: &str, tokens: &mut Vec<String>) {
    const TYPE_KINDS: [&str; 5] = [
        "type_identifier",
        "primitive_type",
        "template_type",
        "qualified_identifier",
        "type_qualifier",
    ];

    let kind = node.kind();
    if TYPE_KINDS.contains(&kind) {
        tokens.push(node_text(node, content));
        return;
    }
    if kind == "*" || kind == "&" {
        tokens.push(kind.to_string());
        return;
    }

    for i in 0..node.child_count() {
        if let Some(child) = node.child(i) {
            collect_type_tokens(child, content, tokens);
        }
    }
}
