//! XPath Evaluation Engine
//!
//! Evaluates compiled XPath expressions against any `DocumentAccess`
//! implementation with a value stack.

use super::axes::{attribute_values, is_reverse, matches_node_test, navigate};
use super::compiler::{CompiledExpr, CompiledNodeTest, Op};
use super::functions;
use super::parser::{Axis, BinaryOp};
use super::value::XPathValue;
use crate::dom::{DocumentAccess, NodeId};
use std::collections::{HashMap, HashSet};

/// Variable bindings for `$name` references
pub type Variables = HashMap<String, XPathValue>;

/// Evaluation context - generic over document type
pub struct EvalContext<'a, D: DocumentAccess + ?Sized> {
    pub doc: &'a D,
    pub context_node: NodeId,
    pub context_position: usize,
    pub context_size: usize,
    pub variables: Option<&'a Variables>,
}

impl<'a, D: DocumentAccess + ?Sized> EvalContext<'a, D> {
    pub fn new(doc: &'a D, context_node: NodeId) -> Self {
        EvalContext {
            doc,
            context_node,
            context_position: 1,
            context_size: 1,
            variables: None,
        }
    }

    fn at(&self, node: NodeId, position: usize, size: usize) -> Self {
        EvalContext {
            doc: self.doc,
            context_node: node,
            context_position: position,
            context_size: size,
            variables: self.variables,
        }
    }
}

/// Evaluate an XPath expression with the document node as context
#[must_use = "XPath evaluation result should be used"]
pub fn evaluate<D: DocumentAccess + ?Sized>(doc: &D, xpath: &str) -> Result<XPathValue, String> {
    evaluate_from_node(doc, doc.document_node_id(), xpath)
}

/// Evaluate an XPath expression from a specific context node
#[must_use = "XPath evaluation result should be used"]
pub fn evaluate_from_node<D: DocumentAccess + ?Sized>(
    doc: &D,
    context_node: NodeId,
    xpath: &str,
) -> Result<XPathValue, String> {
    let compiled = super::compiler::compile(xpath)?;
    evaluate_compiled(&compiled, &EvalContext::new(doc, context_node))
}

impl CompiledExpr {
    /// Evaluate against `doc` with `node` as the context node
    pub fn evaluate<D: DocumentAccess + ?Sized>(
        &self,
        doc: &D,
        node: NodeId,
        variables: Option<&Variables>,
    ) -> Result<XPathValue, String> {
        let mut ctx = EvalContext::new(doc, node);
        ctx.variables = variables;
        evaluate_compiled(self, &ctx)
    }

    /// Evaluate and require a node-set result
    pub fn select_nodes<D: DocumentAccess + ?Sized>(
        &self,
        doc: &D,
        node: NodeId,
    ) -> Result<Vec<NodeId>, String> {
        match self.evaluate(doc, node, None)? {
            XPathValue::NodeSet(nodes) => Ok(nodes),
            other => Err(format!("expression does not select nodes: {:?}", other)),
        }
    }
}

/// Evaluate a compiled expression
pub fn evaluate_compiled<D: DocumentAccess + ?Sized>(
    expr: &CompiledExpr,
    ctx: &EvalContext<'_, D>,
) -> Result<XPathValue, String> {
    let mut stack: Vec<XPathValue> = Vec::new();

    for op in &expr.ops {
        match op {
            Op::Root => stack.push(XPathValue::single_node(ctx.doc.document_node_id())),

            Op::Context => stack.push(XPathValue::single_node(ctx.context_node)),

            Op::Step {
                axis,
                test,
                predicates,
            } => {
                let current = pop(&mut stack)?;
                let nodes = match current {
                    XPathValue::NodeSet(nodes) => nodes,
                    XPathValue::StringList(_) => {
                        return Err("Cannot navigate from attribute values".to_string())
                    }
                    other => return Err(format!("Location step applied to {:?}", other)),
                };
                stack.push(step(ctx, &nodes, *axis, test, predicates)?);
            }

            Op::Predicate(pred) => {
                let current = pop(&mut stack)?;
                let filtered = match current {
                    XPathValue::NodeSet(nodes) => XPathValue::NodeSet(filter(ctx, nodes, pred)?),
                    XPathValue::StringList(values) => {
                        XPathValue::StringList(filter_values(ctx, values, pred)?)
                    }
                    _ => return Err("Predicate applied to a non node-set".to_string()),
                };
                stack.push(filtered);
            }

            Op::Union => {
                let right = pop(&mut stack)?;
                let left = pop(&mut stack)?;
                match (left, right) {
                    (XPathValue::NodeSet(l), XPathValue::NodeSet(r)) => {
                        let mut seen: HashSet<NodeId> = l.iter().copied().collect();
                        let mut result = l;
                        result.extend(r.into_iter().filter(|n| seen.insert(*n)));
                        // Node ids follow document order
                        result.sort_unstable();
                        stack.push(XPathValue::NodeSet(result));
                    }
                    (XPathValue::StringList(mut l), XPathValue::StringList(r)) => {
                        l.extend(r);
                        stack.push(XPathValue::StringList(l));
                    }
                    _ => return Err("Union requires two node-sets".to_string()),
                }
            }

            Op::Number(n) => stack.push(XPathValue::Number(*n)),

            Op::String(s) => stack.push(XPathValue::String(s.clone())),

            Op::Variable(name) => {
                let value = ctx
                    .variables
                    .and_then(|vars| vars.get(name))
                    .ok_or_else(|| format!("Undefined variable: ${}", name))?;
                stack.push(value.clone());
            }

            Op::Negate => {
                let val = pop(&mut stack)?;
                stack.push(XPathValue::Number(-val.number_in(ctx.doc)));
            }

            Op::Binary(op) => {
                let right = pop(&mut stack)?;
                let left = pop(&mut stack)?;
                let doc = ctx.doc;
                let result = match op {
                    BinaryOp::Or => XPathValue::Boolean(left.to_boolean() || right.to_boolean()),
                    BinaryOp::And => XPathValue::Boolean(left.to_boolean() && right.to_boolean()),
                    BinaryOp::Eq
                    | BinaryOp::NotEq
                    | BinaryOp::Lt
                    | BinaryOp::LtEq
                    | BinaryOp::Gt
                    | BinaryOp::GtEq => XPathValue::Boolean(compare(doc, &left, &right, *op)),
                    BinaryOp::Add => arith(doc, &left, &right, |a, b| a + b),
                    BinaryOp::Sub => arith(doc, &left, &right, |a, b| a - b),
                    BinaryOp::Mul => arith(doc, &left, &right, |a, b| a * b),
                    BinaryOp::Div => arith(doc, &left, &right, |a, b| a / b),
                    BinaryOp::Mod => arith(doc, &left, &right, |a, b| a % b),
                };
                stack.push(result);
            }

            Op::Call(name, arg_count) => {
                if stack.len() < *arg_count {
                    return Err(format!("Stack underflow calling {}()", name));
                }
                let args = stack.split_off(stack.len() - arg_count);
                let result = functions::call(
                    name,
                    args,
                    ctx.doc,
                    ctx.context_node,
                    ctx.context_position,
                    ctx.context_size,
                )?;
                stack.push(result);
            }
        }
    }

    pop(&mut stack)
}

fn pop(stack: &mut Vec<XPathValue>) -> Result<XPathValue, String> {
    stack
        .pop()
        .ok_or_else(|| "Malformed expression: empty stack".to_string())
}

/// One location step from every node in `nodes`; predicates see positions
/// in axis order relative to each context node
fn step<D: DocumentAccess + ?Sized>(
    ctx: &EvalContext<'_, D>,
    nodes: &[NodeId],
    axis: Axis,
    test: &CompiledNodeTest,
    predicates: &[CompiledExpr],
) -> Result<XPathValue, String> {
    if axis == Axis::Attribute {
        let mut values = Vec::new();
        for &node in nodes {
            let mut selected = attribute_values(ctx.doc, node, test);
            for pred in predicates {
                selected = filter_values(ctx, selected, pred)?;
            }
            values.extend(selected);
        }
        return Ok(XPathValue::StringList(values));
    }

    let mut seen = HashSet::with_capacity(nodes.len());
    let mut result = Vec::with_capacity(nodes.len());
    for &node in nodes {
        let mut selected: Vec<NodeId> = navigate(ctx.doc, node, axis)
            .into_iter()
            .filter(|&candidate| matches_node_test(ctx.doc, candidate, test))
            .collect();
        for pred in predicates {
            selected = filter(ctx, selected, pred)?;
        }
        result.extend(selected.into_iter().filter(|n| seen.insert(*n)));
    }
    if nodes.len() > 1 || is_reverse(axis) {
        result.sort_unstable();
    }
    Ok(XPathValue::NodeSet(result))
}

fn keep(result: &XPathValue, position: usize) -> bool {
    match result {
        XPathValue::Number(n) => *n == position as f64,
        other => other.to_boolean(),
    }
}

fn filter<D: DocumentAccess + ?Sized>(
    ctx: &EvalContext<'_, D>,
    nodes: Vec<NodeId>,
    pred: &CompiledExpr,
) -> Result<Vec<NodeId>, String> {
    let size = nodes.len();
    let mut filtered = Vec::new();
    for (i, node) in nodes.into_iter().enumerate() {
        let result = evaluate_compiled(pred, &ctx.at(node, i + 1, size))?;
        if keep(&result, i + 1) {
            filtered.push(node);
        }
    }
    Ok(filtered)
}

/// Predicates over attribute values keep the owner element as context
fn filter_values<D: DocumentAccess + ?Sized>(
    ctx: &EvalContext<'_, D>,
    values: Vec<String>,
    pred: &CompiledExpr,
) -> Result<Vec<String>, String> {
    let size = values.len();
    let mut filtered = Vec::new();
    for (i, value) in values.into_iter().enumerate() {
        let result = evaluate_compiled(pred, &ctx.at(ctx.context_node, i + 1, size))?;
        if keep(&result, i + 1) {
            filtered.push(value);
        }
    }
    Ok(filtered)
}

fn arith<D, F>(doc: &D, left: &XPathValue, right: &XPathValue, f: F) -> XPathValue
where
    D: DocumentAccess + ?Sized,
    F: Fn(f64, f64) -> f64,
{
    XPathValue::Number(f(left.number_in(doc), right.number_in(doc)))
}

fn compare_numbers(a: f64, b: f64, op: BinaryOp) -> bool {
    match op {
        BinaryOp::Eq => a == b,
        BinaryOp::NotEq => a != b,
        BinaryOp::Lt => a < b,
        BinaryOp::LtEq => a <= b,
        BinaryOp::Gt => a > b,
        BinaryOp::GtEq => a >= b,
        _ => false,
    }
}

fn compare_strings(a: &str, b: &str, op: BinaryOp) -> bool {
    match op {
        BinaryOp::Eq => a == b,
        BinaryOp::NotEq => a != b,
        _ => compare_numbers(
            super::value::parse_number(a),
            super::value::parse_number(b),
            op,
        ),
    }
}

fn is_equality(op: BinaryOp) -> bool {
    matches!(op, BinaryOp::Eq | BinaryOp::NotEq)
}

/// Mirror a relational operator so the member set can sit on the left
fn flip(op: BinaryOp) -> BinaryOp {
    match op {
        BinaryOp::Lt => BinaryOp::Gt,
        BinaryOp::LtEq => BinaryOp::GtEq,
        BinaryOp::Gt => BinaryOp::Lt,
        BinaryOp::GtEq => BinaryOp::LtEq,
        other => other,
    }
}

/// XPath 1.0 comparison. Node-sets and attribute lists compare
/// existentially over their members' string-values.
fn compare<D: DocumentAccess + ?Sized>(
    doc: &D,
    left: &XPathValue,
    right: &XPathValue,
    op: BinaryOp,
) -> bool {
    match (left.member_strings(doc), right.member_strings(doc)) {
        (Some(ls), Some(rs)) => ls
            .iter()
            .any(|l| rs.iter().any(|r| compare_strings(l, r, op))),
        (Some(members), None) => compare_members(&members, left, right, op),
        (None, Some(members)) => compare_members(&members, right, left, flip(op)),
        (None, None) => {
            if is_equality(op) {
                if matches!(left, XPathValue::Boolean(_)) || matches!(right, XPathValue::Boolean(_))
                {
                    compare_numbers(
                        left.to_boolean() as u8 as f64,
                        right.to_boolean() as u8 as f64,
                        op,
                    )
                } else if matches!(left, XPathValue::Number(_))
                    || matches!(right, XPathValue::Number(_))
                {
                    compare_numbers(left.to_number(), right.to_number(), op)
                } else {
                    compare_strings(&left.to_string_value(), &right.to_string_value(), op)
                }
            } else {
                compare_numbers(left.to_number(), right.to_number(), op)
            }
        }
    }
}

fn compare_members(members: &[String], set: &XPathValue, other: &XPathValue, op: BinaryOp) -> bool {
    match other {
        XPathValue::Boolean(b) => {
            compare_numbers(set.to_boolean() as u8 as f64, *b as u8 as f64, op)
        }
        XPathValue::Number(n) => members
            .iter()
            .any(|m| compare_numbers(super::value::parse_number(m), *n, op)),
        other => {
            let s = other.to_string_value();
            members.iter().any(|m| compare_strings(m, &s, op))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::XmlDocument;

    fn doc(xml: &str) -> XmlDocument {
        XmlDocument::parse_str(xml).unwrap()
    }

    fn count(d: &XmlDocument, xpath: &str) -> usize {
        evaluate(d, xpath).unwrap().as_nodeset().unwrap().len()
    }

    #[test]
    fn test_simple_path() {
        let d = doc("<root><child/></root>");
        assert_eq!(count(&d, "/root/child"), 1);
        assert_eq!(count(&d, "//child/.."), 1);
    }

    #[test]
    fn test_position_per_context_node() {
        let d = doc("<r><s><p>1</p><p>2</p></s><s><p>3</p></s></r>");
        let first = evaluate(&d, "//s/p[1]").unwrap();
        let texts: Vec<String> = first
            .as_nodeset()
            .unwrap()
            .iter()
            .map(|&n| crate::dom::node_string_value(&d, n))
            .collect();
        assert_eq!(texts, vec!["1", "3"]);
        assert_eq!(count(&d, "(//p)[1]"), 1);
        assert_eq!(count(&d, "//p[last()]"), 2);
    }

    #[test]
    fn test_reverse_axis_positions() {
        let d = doc("<r><a><b><c/></b></a></r>");
        let c = evaluate(&d, "//c").unwrap().into_nodes()[0];
        let nearest = evaluate_from_node(&d, c, "ancestor::*[1]").unwrap();
        assert_eq!(
            d.node_name(nearest.into_nodes()[0]),
            Some("b")
        );
    }

    #[test]
    fn test_attribute_comparisons() {
        let d = doc("<r><p class='x'/><p class='y'/><p/></r>");
        assert_eq!(count(&d, "//p[@class='y']"), 1);
        assert_eq!(count(&d, "//p[@class]"), 2);
        assert_eq!(count(&d, "//p[not(@class)]"), 1);
        assert_eq!(count(&d, "//p[@class!='x']"), 1);
    }

    #[test]
    fn test_nodeset_number_comparison() {
        let d = doc("<r><n>5</n><n>10</n></r>");
        assert!(evaluate(&d, "//n > 7").unwrap().to_boolean());
        assert!(!evaluate(&d, "//n > 10").unwrap().to_boolean());
        assert!(evaluate(&d, "sum(//n) = 15").unwrap().to_boolean());
    }

    #[test]
    fn test_namespaced_steps() {
        let d = doc(
            "<dtbook xmlns='http://www.daisy.org/z3986/2005/dtbook/'><level1/><level1/></dtbook>",
        );
        assert_eq!(count(&d, "/dtb:dtbook/dtb:level1"), 2);
        assert_eq!(count(&d, "//dtb:*"), 3);
        assert_eq!(count(&d, "//level1"), 2);
        assert_eq!(count(&d, "//xhtml:level1"), 0);
    }

    #[test]
    fn test_variables() {
        let d = doc("<r><p id='a'/><p id='b'/></r>");
        let compiled = super::super::compiler::compile("//p[@id=$which]").unwrap();
        let mut vars = Variables::new();
        vars.insert("which".to_string(), XPathValue::from("b"));
        let result = compiled.evaluate(&d, 0, Some(&vars)).unwrap();
        assert_eq!(result.into_nodes().len(), 1);
        assert!(compiled.evaluate(&d, 0, None).is_err());
    }

    #[test]
    fn test_count_and_arithmetic() {
        let d = doc("<root><a/><b/><c/></root>");
        assert_eq!(evaluate(&d, "count(/root/*)").unwrap().to_number(), 3.0);
        assert_eq!(evaluate(&d, "count(/root/*) * 2 div 3").unwrap().to_number(), 2.0);
        assert_eq!(evaluate(&d, "7 mod 4").unwrap().to_number(), 3.0);
    }

    #[test]
    fn test_select_nodes_rejects_scalars() {
        let d = doc("<r/>");
        let compiled = super::super::compiler::compile("1 + 1").unwrap();
        assert!(compiled.select_nodes(&d, 0).is_err());
    }
}
