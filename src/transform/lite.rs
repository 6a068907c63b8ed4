//! Built-in stylesheet engine
//!
//! Runs the part of XSLT 1.0 that section rendering needs, so a service
//! works without an external processor. Supported:
//! - top level: `xsl:param`, `xsl:import`, `xsl:include`, `xsl:template`,
//!   `xsl:output` (accepted, no effect)
//! - instructions: literal result elements with attribute value templates,
//!   `value-of`, `copy-of`, `for-each`, `if`, `choose`, `text`, `element`,
//!   `attribute`, `call-template`, `variable`
//!
//! Only one template is instantiated per run: the `match="/"` template if
//! there is one, otherwise the first template whose pattern selects the
//! input's root element. There is no `apply-templates`.

use super::stylesheet::{StylesheetEngine, StylesheetTransformer, Templates};
use super::{ParamValue, ResourceResolver};
use crate::dom::{ns, NamespaceContext, NodeId, NodeKind, XmlDocument, DOCUMENT_NODE};
use crate::error::{DomError, TransformError};
use crate::reader::split_name;
use crate::xpath::{compile_with, evaluate_compiled, CompiledExpr, EvalContext, Variables, XPathValue};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

const MAX_IMPORT_DEPTH: usize = 16;
const MAX_CALL_DEPTH: usize = 256;

/// The built-in engine. Prefixes bound in `namespaces` are usable in
/// stylesheet expressions in addition to those the stylesheet declares.
#[derive(Debug, Clone, Default)]
pub struct LiteEngine {
    namespaces: NamespaceContext,
}

impl LiteEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_namespaces(namespaces: NamespaceContext) -> Self {
        LiteEngine { namespaces }
    }

    fn compile_module(
        &self,
        source: &[u8],
        system_id: &Path,
        resolver: &ResourceResolver,
        depth: usize,
    ) -> Result<Stylesheet, TransformError> {
        let fail = |message: String| {
            TransformError::configuration(system_id.display().to_string(), message)
        };
        if depth > MAX_IMPORT_DEPTH {
            return Err(fail("imports nested too deeply".to_string()));
        }
        let doc = XmlDocument::parse(source).map_err(|e| fail(e.to_string()))?;
        let root = doc
            .root_element_id()
            .ok_or_else(|| fail("empty stylesheet".to_string()))?;
        if doc.node_namespace_uri(root) != Some(ns::XSLT)
            || !matches!(doc.node_local_name(root), Some("stylesheet" | "transform"))
        {
            return Err(fail(format!(
                "<{}> is not an xsl:stylesheet",
                doc.node_name(root).unwrap_or_default()
            )));
        }

        let mut namespaces = self.namespaces.clone();
        for (name, uri) in doc.get_attribute_values(root) {
            if let Some(prefix) = name.strip_prefix("xmlns:") {
                namespaces.bind(prefix, uri);
            }
        }
        let module = Module {
            doc: &doc,
            namespaces: Arc::new(namespaces),
        };

        let mut sheet = Stylesheet::default();
        let mut imports = Vec::new();
        for child in doc.children(root) {
            match doc.node_kind_of(child) {
                Some(NodeKind::Element) => {}
                Some(NodeKind::Text | NodeKind::CData) => {
                    if !doc.text_content(child).unwrap_or_default().trim().is_empty() {
                        return Err(fail("text is not allowed at the top level".to_string()));
                    }
                    continue;
                }
                _ => continue,
            }
            if doc.node_namespace_uri(child) != Some(ns::XSLT) {
                continue;
            }
            match doc.node_local_name(child).unwrap_or_default() {
                local @ ("import" | "include") => {
                    let href = module.required(child, "href").map_err(fail)?;
                    let path = resolver.resolve_href(href, system_id).map_err(|e| fail(e.to_string()))?;
                    let bytes = fs::read(&path)
                        .map_err(|e| fail(format!("{}: {}", path.display(), e)))?;
                    let nested = self.compile_module(&bytes, &path, resolver, depth + 1)?;
                    if local == "import" {
                        imports.push(nested);
                    } else {
                        sheet.absorb(nested);
                    }
                }
                "param" => sheet.params.push(module.param(child).map_err(fail)?),
                "template" => {
                    let template = Arc::new(module.template(child).map_err(fail)?);
                    if let Some(name) = &template.name {
                        sheet
                            .named
                            .entry(name.clone())
                            .or_insert_with(|| Arc::clone(&template));
                    }
                    if template.pattern.is_some() {
                        sheet.templates.push(template);
                    }
                }
                "output" => {}
                other => return Err(fail(format!("unsupported top-level element xsl:{}", other))),
            }
        }

        // Later imports take precedence over earlier ones
        for imported in imports.into_iter().rev() {
            sheet.absorb(imported);
        }
        Ok(sheet)
    }
}

impl StylesheetEngine for LiteEngine {
    fn compile(
        &self,
        source: &[u8],
        system_id: &Path,
        resolver: &ResourceResolver,
    ) -> Result<Arc<dyn Templates>, TransformError> {
        let sheet = self.compile_module(source, system_id, resolver, 0)?;
        let name = system_id
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Arc::new(LiteTemplates {
            sheet: Arc::new(sheet),
            name,
        }))
    }
}

// ============================================================================
// Compiled form
// ============================================================================

#[derive(Debug)]
enum Value {
    Select(CompiledExpr),
    Content(Vec<Instruction>),
    Empty,
}

#[derive(Debug)]
struct Param {
    name: String,
    value: Value,
}

#[derive(Debug)]
struct Template {
    /// Pattern source and its compiled expression
    pattern: Option<(String, CompiledExpr)>,
    name: Option<String>,
    params: Vec<Param>,
    body: Vec<Instruction>,
}

/// Attribute value template
#[derive(Debug)]
enum AvtPart {
    Text(String),
    Expr(CompiledExpr),
}

#[derive(Debug)]
struct Avt(Vec<AvtPart>);

#[derive(Debug)]
enum Instruction {
    Literal {
        name: String,
        namespace: Option<String>,
        attributes: Vec<(String, Option<String>, Avt)>,
        body: Vec<Instruction>,
    },
    Text(String),
    ValueOf(CompiledExpr),
    CopyOf(CompiledExpr),
    ForEach(CompiledExpr, Vec<Instruction>),
    If(CompiledExpr, Vec<Instruction>),
    Choose(Vec<(CompiledExpr, Vec<Instruction>)>, Vec<Instruction>),
    Element(Constructor),
    Attribute(Constructor),
    CallTemplate(String, Vec<Param>),
    Variable(Param),
}

/// `xsl:element` / `xsl:attribute`
#[derive(Debug)]
struct Constructor {
    name: Avt,
    namespace: Option<Avt>,
    prefixes: Arc<NamespaceContext>,
    body: Vec<Instruction>,
}

#[derive(Debug, Default)]
struct Stylesheet {
    params: Vec<Param>,
    /// Match templates, highest precedence first
    templates: Vec<Arc<Template>>,
    named: HashMap<String, Arc<Template>>,
}

impl Stylesheet {
    /// Add definitions from `other` at lower precedence
    fn absorb(&mut self, other: Stylesheet) {
        for param in other.params {
            if !self.params.iter().any(|p| p.name == param.name) {
                self.params.push(param);
            }
        }
        self.templates.extend(other.templates);
        for (name, template) in other.named {
            self.named.entry(name).or_insert(template);
        }
    }
}

// ============================================================================
// Compilation
// ============================================================================

struct Module<'d> {
    doc: &'d XmlDocument,
    namespaces: Arc<NamespaceContext>,
}

impl<'d> Module<'d> {
    fn required(&self, node: NodeId, attr: &str) -> Result<&'d str, String> {
        self.doc.get_attribute(node, attr).ok_or_else(|| {
            format!(
                "<{}> requires a `{}` attribute",
                self.doc.node_name(node).unwrap_or_default(),
                attr
            )
        })
    }

    fn expr(&self, text: &str) -> Result<CompiledExpr, String> {
        compile_with(text, &self.namespaces)
            .map_err(|e| format!("invalid expression `{}`: {}", text, e))
    }

    fn avt(&self, text: &str) -> Result<Avt, String> {
        let mut parts = Vec::new();
        let mut literal = String::new();
        let mut chars = text.chars().peekable();
        while let Some(c) = chars.next() {
            match c {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    literal.push('{');
                }
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    literal.push('}');
                }
                '{' => {
                    let mut expr = String::new();
                    let mut quote = None;
                    loop {
                        match chars.next() {
                            None => return Err(format!("unterminated `{{` in `{}`", text)),
                            Some('}') if quote.is_none() => break,
                            Some(q @ ('"' | '\'')) => {
                                quote = match quote {
                                    None => Some(q),
                                    Some(open) if open == q => None,
                                    other => other,
                                };
                                expr.push(q);
                            }
                            Some(other) => expr.push(other),
                        }
                    }
                    if !literal.is_empty() {
                        parts.push(AvtPart::Text(std::mem::take(&mut literal)));
                    }
                    parts.push(AvtPart::Expr(self.expr(&expr)?));
                }
                '}' => return Err(format!("unmatched `}}` in `{}`", text)),
                other => literal.push(other),
            }
        }
        if !literal.is_empty() {
            parts.push(AvtPart::Text(literal));
        }
        Ok(Avt(parts))
    }

    fn is_xsl(&self, node: NodeId, local: &str) -> bool {
        self.doc.node_kind_of(node) == Some(NodeKind::Element)
            && self.doc.node_namespace_uri(node) == Some(ns::XSLT)
            && self.doc.node_local_name(node) == Some(local)
    }

    fn param(&self, node: NodeId) -> Result<Param, String> {
        let name = self.required(node, "name")?.to_string();
        let value = match self.doc.get_attribute(node, "select") {
            Some(select) => Value::Select(self.expr(select)?),
            None if self.doc.children(node).next().is_some() => {
                Value::Content(self.body(self.doc.children(node))?)
            }
            None => Value::Empty,
        };
        Ok(Param { name, value })
    }

    fn template(&self, node: NodeId) -> Result<Template, String> {
        let pattern = match self.doc.get_attribute(node, "match") {
            Some(text) => Some((text.to_string(), self.expr(text)?)),
            None => None,
        };
        let name = self.doc.get_attribute(node, "name").map(str::to_string);
        if pattern.is_none() && name.is_none() {
            return Err("xsl:template needs `match` or `name`".to_string());
        }
        let (params, rest): (Vec<NodeId>, Vec<NodeId>) = self
            .doc
            .children(node)
            .partition(|&child| self.is_xsl(child, "param"));
        Ok(Template {
            pattern,
            name,
            params: params
                .into_iter()
                .map(|p| self.param(p))
                .collect::<Result<_, _>>()?,
            body: self.body(rest)?,
        })
    }

    fn body(&self, nodes: impl IntoIterator<Item = NodeId>) -> Result<Vec<Instruction>, String> {
        let mut out = Vec::new();
        for node in nodes {
            if let Some(instruction) = self.instruction(node)? {
                out.push(instruction);
            }
        }
        Ok(out)
    }

    fn instruction(&self, node: NodeId) -> Result<Option<Instruction>, String> {
        let doc = self.doc;
        match doc.node_kind_of(node) {
            Some(NodeKind::Element) => {}
            Some(NodeKind::Text | NodeKind::CData) => {
                let text = doc.text_content(node).unwrap_or_default();
                return Ok((!text.trim().is_empty()).then(|| Instruction::Text(text.to_string())));
            }
            _ => return Ok(None),
        }
        if doc.node_namespace_uri(node) != Some(ns::XSLT) {
            return self.literal(node).map(Some);
        }

        let select = || self.required(node, "select").and_then(|s| self.expr(s));
        let test = || self.required(node, "test").and_then(|s| self.expr(s));
        let children = || self.body(doc.children(node));
        let instruction = match doc.node_local_name(node).unwrap_or_default() {
            "value-of" => Instruction::ValueOf(select()?),
            "copy-of" => Instruction::CopyOf(select()?),
            "for-each" => Instruction::ForEach(select()?, children()?),
            "if" => Instruction::If(test()?, children()?),
            "text" => Instruction::Text(doc.string_value(node)),
            "choose" => {
                let mut whens = Vec::new();
                let mut otherwise = Vec::new();
                for child in doc.child_elements(node) {
                    if self.is_xsl(child, "when") {
                        let test = self.expr(self.required(child, "test")?)?;
                        whens.push((test, self.body(doc.children(child))?));
                    } else if self.is_xsl(child, "otherwise") {
                        otherwise = self.body(doc.children(child))?;
                    } else {
                        return Err("xsl:choose may only hold xsl:when and xsl:otherwise".to_string());
                    }
                }
                Instruction::Choose(whens, otherwise)
            }
            local @ ("element" | "attribute") => {
                let constructor = Constructor {
                    name: self.avt(self.required(node, "name")?)?,
                    namespace: doc
                        .get_attribute(node, "namespace")
                        .map(|n| self.avt(n))
                        .transpose()?,
                    prefixes: Arc::clone(&self.namespaces),
                    body: children()?,
                };
                if local == "element" {
                    Instruction::Element(constructor)
                } else {
                    Instruction::Attribute(constructor)
                }
            }
            "call-template" => {
                let name = self.required(node, "name")?.to_string();
                let mut with = Vec::new();
                for child in doc.child_elements(node) {
                    if !self.is_xsl(child, "with-param") {
                        return Err("xsl:call-template may only hold xsl:with-param".to_string());
                    }
                    with.push(self.param(child)?);
                }
                Instruction::CallTemplate(name, with)
            }
            "variable" => Instruction::Variable(self.param(node)?),
            other => return Err(format!("unsupported instruction xsl:{}", other)),
        };
        Ok(Some(instruction))
    }

    fn literal(&self, node: NodeId) -> Result<Instruction, String> {
        let doc = self.doc;
        let mut attributes = Vec::new();
        for attr in doc.attributes(node) {
            let name = doc.strings.get_str(attr.name_id).unwrap_or_default();
            let uri = doc.strings.get_str(attr.namespace_id).filter(|u| !u.is_empty());
            if name == "xmlns" || name.starts_with("xmlns:") || uri == Some(ns::XSLT) {
                continue;
            }
            let value = doc.strings.get_str(attr.value_id).unwrap_or_default();
            attributes.push((name.to_string(), uri.map(str::to_string), self.avt(value)?));
        }
        Ok(Instruction::Literal {
            name: doc.node_name(node).unwrap_or_default().to_string(),
            namespace: doc.node_namespace_uri(node).map(str::to_string),
            attributes,
            body: self.body(doc.children(node))?,
        })
    }
}

// ============================================================================
// Execution
// ============================================================================

struct LiteTemplates {
    sheet: Arc<Stylesheet>,
    name: String,
}

impl Templates for LiteTemplates {
    fn new_transformer(&self) -> Box<dyn StylesheetTransformer> {
        Box::new(LiteTransformer {
            sheet: Arc::clone(&self.sheet),
            name: self.name.clone(),
            overrides: HashMap::new(),
        })
    }
}

struct LiteTransformer {
    sheet: Arc<Stylesheet>,
    name: String,
    overrides: HashMap<String, XPathValue>,
}

impl StylesheetTransformer for LiteTransformer {
    fn set_parameter(&mut self, name: &str, value: &ParamValue) {
        self.overrides.insert(name.to_string(), value.into());
    }

    fn transform(&mut self, input: &XmlDocument) -> Result<XmlDocument, TransformError> {
        let mut run = Run {
            sheet: &self.sheet,
            input,
            globals: Variables::new(),
        };
        run.execute_root(&self.overrides)
            .map_err(|message| TransformError::execution(&self.name, message))
    }
}

#[derive(Debug, Clone, Copy)]
struct Focus {
    node: NodeId,
    position: usize,
    size: usize,
}

impl Focus {
    fn at(node: NodeId) -> Self {
        Focus {
            node,
            position: 1,
            size: 1,
        }
    }
}

fn dom(err: DomError) -> String {
    err.to_string()
}

struct Run<'a> {
    sheet: &'a Stylesheet,
    input: &'a XmlDocument,
    globals: Variables,
}

impl Run<'_> {
    fn execute_root(&mut self, overrides: &HashMap<String, XPathValue>) -> Result<XmlDocument, String> {
        for param in &self.sheet.params {
            let value = match overrides.get(&param.name) {
                Some(value) => value.clone(),
                None => self.value(&param.value, Focus::at(DOCUMENT_NODE), &self.globals, 0)?,
            };
            self.globals.insert(param.name.clone(), value);
        }

        let (template, focus) = self.root_template()?;
        let mut vars = self.globals.clone();
        for param in &template.params {
            let value = self.value(&param.value, focus, &vars, 0)?;
            vars.insert(param.name.clone(), value);
        }
        let mut out = XmlDocument::new();
        self.execute(&template.body, focus, &vars, &mut out, DOCUMENT_NODE, 0)?;
        Ok(out)
    }

    fn root_template(&self) -> Result<(&Template, Focus), String> {
        if let Some(template) = self
            .sheet
            .templates
            .iter()
            .find(|t| matches!(&t.pattern, Some((text, _)) if text.trim() == "/"))
        {
            return Ok((template, Focus::at(DOCUMENT_NODE)));
        }
        let root = self
            .input
            .root_element_id()
            .ok_or_else(|| "input document has no root element".to_string())?;
        for template in &self.sheet.templates {
            if let Some((_, pattern)) = &template.pattern {
                let selected = self.eval(pattern, Focus::at(DOCUMENT_NODE), &self.globals)?;
                if selected.as_nodeset().is_some_and(|nodes| nodes.contains(&root)) {
                    return Ok((template, Focus::at(root)));
                }
            }
        }
        Err(format!(
            "no template matches <{}>",
            self.input.node_name(root).unwrap_or_default()
        ))
    }

    fn eval(&self, expr: &CompiledExpr, focus: Focus, vars: &Variables) -> Result<XPathValue, String> {
        let ctx = EvalContext {
            doc: self.input,
            context_node: focus.node,
            context_position: focus.position,
            context_size: focus.size,
            variables: Some(vars),
        };
        evaluate_compiled(expr, &ctx)
    }

    fn value(&self, value: &Value, focus: Focus, vars: &Variables, depth: usize) -> Result<XPathValue, String> {
        match value {
            Value::Select(expr) => self.eval(expr, focus, vars),
            Value::Content(body) => Ok(XPathValue::String(self.fragment_text(body, focus, vars, depth)?)),
            Value::Empty => Ok(XPathValue::String(String::new())),
        }
    }

    fn avt(&self, avt: &Avt, focus: Focus, vars: &Variables) -> Result<String, String> {
        let mut out = String::new();
        for part in &avt.0 {
            match part {
                AvtPart::Text(text) => out.push_str(text),
                AvtPart::Expr(expr) => out.push_str(&self.eval(expr, focus, vars)?.string_in(self.input)),
            }
        }
        Ok(out)
    }

    /// Run `body` into a scratch element and return its text
    fn fragment_text(&self, body: &[Instruction], focus: Focus, vars: &Variables, depth: usize) -> Result<String, String> {
        let mut scratch = XmlDocument::new();
        let holder = scratch.append_element(DOCUMENT_NODE, "fragment", None).map_err(dom)?;
        self.execute(body, focus, vars, &mut scratch, holder, depth)?;
        Ok(scratch.string_value(holder))
    }

    fn constructed_name(
        &self,
        constructor: &Constructor,
        focus: Focus,
        vars: &Variables,
    ) -> Result<(String, Option<String>), String> {
        let name = self.avt(&constructor.name, focus, vars)?;
        let namespace = match &constructor.namespace {
            Some(avt) => Some(self.avt(avt, focus, vars)?).filter(|uri| !uri.is_empty()),
            None => match split_name(&name).0 {
                Some(prefix) => Some(
                    constructor
                        .prefixes
                        .uri_for(prefix)
                        .ok_or_else(|| format!("unbound prefix `{}` in `{}`", prefix, name))?
                        .to_string(),
                ),
                None => None,
            },
        };
        Ok((name, namespace))
    }

    fn execute(
        &self,
        body: &[Instruction],
        focus: Focus,
        vars: &Variables,
        out: &mut XmlDocument,
        parent: NodeId,
        depth: usize,
    ) -> Result<(), String> {
        let mut scope: Option<Variables> = None;
        for instruction in body {
            let vars = scope.as_ref().unwrap_or(vars);
            match instruction {
                Instruction::Literal {
                    name,
                    namespace,
                    attributes,
                    body,
                } => {
                    let element = out.append_element(parent, name, namespace.as_deref()).map_err(dom)?;
                    for (attr, uri, value) in attributes {
                        let value = self.avt(value, focus, vars)?;
                        out.set_attribute_ns(element, attr, &value, uri.as_deref()).map_err(dom)?;
                    }
                    self.execute(body, focus, vars, out, element, depth)?;
                }
                Instruction::Text(text) => append_text(out, parent, text)?,
                Instruction::ValueOf(expr) => {
                    let text = self.eval(expr, focus, vars)?.string_in(self.input);
                    append_text(out, parent, &text)?;
                }
                Instruction::CopyOf(expr) => match self.eval(expr, focus, vars)? {
                    XPathValue::NodeSet(nodes) => {
                        for node in nodes {
                            let sources = if node == DOCUMENT_NODE {
                                self.input.children(DOCUMENT_NODE).collect()
                            } else {
                                vec![node]
                            };
                            for source in sources {
                                out.import_subtree(parent, self.input, source).map_err(dom)?;
                            }
                        }
                    }
                    XPathValue::StringList(values) => {
                        for value in values {
                            append_text(out, parent, &value)?;
                        }
                    }
                    other => append_text(out, parent, &other.to_string_value())?,
                },
                Instruction::ForEach(select, body) => {
                    let nodes = match self.eval(select, focus, vars)? {
                        XPathValue::NodeSet(nodes) => nodes,
                        other => return Err(format!("xsl:for-each over a non node-set: {:?}", other)),
                    };
                    let size = nodes.len();
                    for (i, node) in nodes.into_iter().enumerate() {
                        let inner = Focus {
                            node,
                            position: i + 1,
                            size,
                        };
                        self.execute(body, inner, vars, out, parent, depth)?;
                    }
                }
                Instruction::If(test, body) => {
                    if self.eval(test, focus, vars)?.to_boolean() {
                        self.execute(body, focus, vars, out, parent, depth)?;
                    }
                }
                Instruction::Choose(whens, otherwise) => {
                    let mut chosen = otherwise;
                    for (test, body) in whens {
                        if self.eval(test, focus, vars)?.to_boolean() {
                            chosen = body;
                            break;
                        }
                    }
                    self.execute(chosen, focus, vars, out, parent, depth)?;
                }
                Instruction::Element(constructor) => {
                    let (name, namespace) = self.constructed_name(constructor, focus, vars)?;
                    let element = out.append_element(parent, &name, namespace.as_deref()).map_err(dom)?;
                    self.execute(&constructor.body, focus, vars, out, element, depth)?;
                }
                Instruction::Attribute(constructor) => {
                    if out.node_kind_of(parent) != Some(NodeKind::Element) {
                        return Err("xsl:attribute outside an element".to_string());
                    }
                    let (name, namespace) = self.constructed_name(constructor, focus, vars)?;
                    let value = self.fragment_text(&constructor.body, focus, vars, depth)?;
                    out.set_attribute_ns(parent, &name, &value, namespace.as_deref()).map_err(dom)?;
                }
                Instruction::CallTemplate(name, with) => {
                    let template = self
                        .sheet
                        .named
                        .get(name)
                        .ok_or_else(|| format!("no template named `{}`", name))?;
                    if depth >= MAX_CALL_DEPTH {
                        return Err(format!("template `{}` recursed too deeply", name));
                    }
                    let mut callee = self.globals.clone();
                    for param in &template.params {
                        let value = match with.iter().find(|w| w.name == param.name) {
                            Some(arg) => self.value(&arg.value, focus, vars, depth)?,
                            None => self.value(&param.value, focus, &callee, depth)?,
                        };
                        callee.insert(param.name.clone(), value);
                    }
                    self.execute(&template.body, focus, &callee, out, parent, depth + 1)?;
                }
                Instruction::Variable(param) => {
                    let value = self.value(&param.value, focus, vars, depth)?;
                    let mut next = vars.clone();
                    next.insert(param.name.clone(), value);
                    scope = Some(next);
                }
            }
        }
        Ok(())
    }
}

/// Whitespace outside the result's root element is dropped
fn append_text(out: &mut XmlDocument, parent: NodeId, text: &str) -> Result<(), String> {
    if text.is_empty() {
        return Ok(());
    }
    if parent == DOCUMENT_NODE {
        if text.trim().is_empty() {
            return Ok(());
        }
        return Err(format!("text `{}` outside the result root element", text.trim()));
    }
    out.append_text(parent, text).map(drop).map_err(dom)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::serialize;

    const INPUT: &str = "<level2 id='a'><h2>Heading</h2><p>One</p><p>Two</p></level2>";

    fn compile(xsl: &str) -> Result<Arc<dyn Templates>, TransformError> {
        LiteEngine::new().compile(xsl.as_bytes(), Path::new("inline.xsl"), &ResourceResolver::new())
    }

    fn run(templates: &Arc<dyn Templates>, params: &[(&str, ParamValue)]) -> Result<String, TransformError> {
        let input = XmlDocument::parse_str(INPUT).unwrap();
        let mut transformer = templates.new_transformer();
        for (name, value) in params {
            transformer.set_parameter(name, value);
        }
        let out = transformer.transform(&input)?;
        Ok(out.root_element_id().map(|r| serialize(&out, r)).unwrap_or_default())
    }

    fn sheet(body: &str) -> String {
        format!(
            "<xsl:stylesheet version='1.0' xmlns:xsl='http://www.w3.org/1999/XSL/Transform'>{}</xsl:stylesheet>",
            body
        )
    }

    #[test]
    fn test_literal_elements_and_for_each() {
        let templates = compile(&sheet(
            r#"<xsl:param name="heading" select="'Untitled'"/>
            <xsl:template match="/">
              <div class="{name(*)}" title="{$heading}">
                <xsl:for-each select="//p">
                  <span n="{position()}/{last()}"><xsl:value-of select="."/></span>
                </xsl:for-each>
              </div>
            </xsl:template>"#,
        ))
        .unwrap();
        assert_eq!(
            run(&templates, &[]).unwrap(),
            r#"<div class="level2" title="Untitled"><span n="1/2">One</span><span n="2/2">Two</span></div>"#
        );
        let with_param = run(&templates, &[("heading", "Intro".into())]).unwrap();
        assert!(with_param.starts_with(r#"<div class="level2" title="Intro">"#));
    }

    #[test]
    fn test_named_templates_and_conditionals() {
        let templates = compile(&sheet(
            r#"<xsl:template match="level2">
              <section>
                <xsl:call-template name="label">
                  <xsl:with-param name="count" select="count(p)"/>
                </xsl:call-template>
                <xsl:element name="h{1 + 1}">
                  <xsl:attribute name="id"><xsl:value-of select="@id"/>-title</xsl:attribute>
                  <xsl:text>Heading</xsl:text>
                </xsl:element>
              </section>
            </xsl:template>
            <xsl:template name="label">
              <xsl:param name="count" select="0"/>
              <xsl:choose>
                <xsl:when test="$count > 1"><xsl:text>many</xsl:text></xsl:when>
                <xsl:otherwise>few</xsl:otherwise>
              </xsl:choose>
              <xsl:if test="$count = 0"><empty/></xsl:if>
            </xsl:template>"#,
        ))
        .unwrap();
        assert_eq!(
            run(&templates, &[]).unwrap(),
            r#"<section>many<h2 id="a-title">Heading</h2></section>"#
        );
    }

    #[test]
    fn test_copy_of_and_variables() {
        let templates = compile(&sheet(
            r#"<xsl:template match="*">
              <wrap>
                <xsl:variable name="first" select="p[1]"/>
                <xsl:copy-of select="$first"/>
                <xsl:copy-of select="count(p)"/>
              </wrap>
            </xsl:template>"#,
        ))
        .unwrap();
        assert_eq!(run(&templates, &[]).unwrap(), "<wrap><p>One</p>2</wrap>");
    }

    #[test]
    fn test_compile_errors() {
        let err = compile(&sheet(r#"<xsl:template match="/"><xsl:apply-templates/></xsl:template>"#));
        assert!(matches!(err, Err(TransformError::Configuration { .. })));
        assert!(compile("<html/>").is_err());
        assert!(compile(&sheet(r#"<xsl:template match="/"><a href="{@x"/></xsl:template>"#)).is_err());
        assert!(compile(&sheet(r#"<xsl:template match="p["/>"#)).is_err());
    }

    #[test]
    fn test_unmatched_root_is_execution_error() {
        let templates = compile(&sheet(r#"<xsl:template match="table"><t/></xsl:template>"#)).unwrap();
        assert!(matches!(run(&templates, &[]), Err(TransformError::Execution { .. })));
    }

    #[test]
    fn test_import_has_lower_precedence() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("common.xsl"),
            sheet(
                r#"<xsl:template match="/"><out><xsl:call-template name="label"/></out></xsl:template>
                <xsl:template name="label">common</xsl:template>"#,
            ),
        )
        .unwrap();
        let main = dir.path().join("main.xsl");
        let source = sheet(
            r#"<xsl:import href="common.xsl"/>
            <xsl:template name="label">main</xsl:template>"#,
        );
        let templates = LiteEngine::new()
            .compile(source.as_bytes(), &main, &ResourceResolver::new())
            .unwrap();
        assert_eq!(run(&templates, &[]).unwrap(), "<out>main</out>");

        let missing = sheet(r#"<xsl:include href="nowhere.xsl"/>"#);
        assert!(LiteEngine::new()
            .compile(missing.as_bytes(), &main, &ResourceResolver::new())
            .is_err());
    }
}
