//! XPath 1.0 Functions
//!
//! Node Set Functions:
//! - position(), last(), count(), local-name(), namespace-uri(), name()
//!
//! String Functions:
//! - string(), concat(), starts-with(), contains(), substring(),
//!   substring-before(), substring-after(), string-length(),
//!   normalize-space(), translate()
//!
//! Boolean Functions:
//! - boolean(), not(), true(), false(), lang()
//!
//! Number Functions:
//! - number(), sum(), floor(), ceiling(), round()

use super::value::{parse_number, XPathValue};
use crate::dom::{self, DocumentAccess, NodeId};

const KNOWN: &[&str] = &[
    "position",
    "last",
    "count",
    "local-name",
    "namespace-uri",
    "name",
    "string",
    "concat",
    "starts-with",
    "contains",
    "substring",
    "substring-before",
    "substring-after",
    "string-length",
    "normalize-space",
    "translate",
    "boolean",
    "not",
    "true",
    "false",
    "lang",
    "number",
    "sum",
    "floor",
    "ceiling",
    "round",
];

/// Whether `name` is a core function this engine evaluates
pub fn is_known(name: &str) -> bool {
    KNOWN.contains(&name)
}

/// Evaluate a function call
pub fn call<D: DocumentAccess + ?Sized>(
    name: &str,
    args: Vec<XPathValue>,
    doc: &D,
    context: NodeId,
    position: usize,
    size: usize,
) -> Result<XPathValue, String> {
    match name {
        "position" => no_args(name, &args).map(|_| XPathValue::Number(position as f64)),
        "last" => no_args(name, &args).map(|_| XPathValue::Number(size as f64)),
        "count" => fn_count(args),
        "local-name" => node_name_fn(name, args, context, |n| {
            doc.node_local_name(n).unwrap_or("").to_string()
        }),
        "namespace-uri" => node_name_fn(name, args, context, |n| {
            doc.node_namespace_uri(n).unwrap_or("").to_string()
        }),
        "name" => node_name_fn(name, args, context, |n| {
            doc.node_name(n).unwrap_or("").to_string()
        }),

        "string" => Ok(XPathValue::String(string_arg(name, &args, doc, context)?)),
        "concat" => fn_concat(args, doc),
        "starts-with" => {
            let (s, prefix) = two_strings(name, &args, doc)?;
            Ok(XPathValue::Boolean(s.starts_with(&prefix)))
        }
        "contains" => {
            let (s, pattern) = two_strings(name, &args, doc)?;
            Ok(XPathValue::Boolean(s.contains(&pattern)))
        }
        "substring" => fn_substring(args, doc),
        "substring-before" => {
            let (s, pattern) = two_strings(name, &args, doc)?;
            let result = s.find(&pattern).map(|pos| &s[..pos]).unwrap_or("");
            Ok(XPathValue::String(result.to_string()))
        }
        "substring-after" => {
            let (s, pattern) = two_strings(name, &args, doc)?;
            let result = s
                .find(&pattern)
                .map(|pos| &s[pos + pattern.len()..])
                .unwrap_or("");
            Ok(XPathValue::String(result.to_string()))
        }
        "string-length" => {
            let s = string_arg(name, &args, doc, context)?;
            Ok(XPathValue::Number(s.chars().count() as f64))
        }
        "normalize-space" => {
            let s = string_arg(name, &args, doc, context)?;
            Ok(XPathValue::String(
                s.split_whitespace().collect::<Vec<_>>().join(" "),
            ))
        }
        "translate" => fn_translate(args, doc),

        "boolean" => one_arg(name, &args).map(|a| XPathValue::Boolean(a.to_boolean())),
        "not" => one_arg(name, &args).map(|a| XPathValue::Boolean(!a.to_boolean())),
        "true" => no_args(name, &args).map(|_| XPathValue::Boolean(true)),
        "false" => no_args(name, &args).map(|_| XPathValue::Boolean(false)),
        "lang" => fn_lang(args, doc, context),

        "number" => {
            let n = if args.is_empty() {
                parse_number(&dom::node_string_value(doc, context))
            } else {
                one_arg(name, &args)?.number_in(doc)
            };
            Ok(XPathValue::Number(n))
        }
        "sum" => fn_sum(args, doc),
        "floor" => number_fn(name, &args, doc, f64::floor),
        "ceiling" => number_fn(name, &args, doc, f64::ceil),
        "round" => number_fn(name, &args, doc, xpath_round),

        _ => Err(format!("Unknown function: {}()", name)),
    }
}

fn no_args(name: &str, args: &[XPathValue]) -> Result<(), String> {
    if args.is_empty() {
        Ok(())
    } else {
        Err(format!("{}() takes no arguments", name))
    }
}

fn one_arg<'v>(name: &str, args: &'v [XPathValue]) -> Result<&'v XPathValue, String> {
    match args {
        [arg] => Ok(arg),
        _ => Err(format!("{}() requires exactly 1 argument", name)),
    }
}

/// Optional single argument defaulting to the context node's string-value
fn string_arg<D: DocumentAccess + ?Sized>(
    name: &str,
    args: &[XPathValue],
    doc: &D,
    context: NodeId,
) -> Result<String, String> {
    match args {
        [] => Ok(dom::node_string_value(doc, context)),
        [arg] => Ok(arg.string_in(doc)),
        _ => Err(format!("{}() requires 0 or 1 arguments", name)),
    }
}

fn two_strings<D: DocumentAccess + ?Sized>(
    name: &str,
    args: &[XPathValue],
    doc: &D,
) -> Result<(String, String), String> {
    match args {
        [a, b] => Ok((a.string_in(doc), b.string_in(doc))),
        _ => Err(format!("{}() requires exactly 2 arguments", name)),
    }
}

fn number_fn<D: DocumentAccess + ?Sized>(
    name: &str,
    args: &[XPathValue],
    doc: &D,
    f: fn(f64) -> f64,
) -> Result<XPathValue, String> {
    Ok(XPathValue::Number(f(one_arg(name, args)?.number_in(doc))))
}

fn node_name_fn<F>(
    name: &str,
    args: Vec<XPathValue>,
    context: NodeId,
    f: F,
) -> Result<XPathValue, String>
where
    F: Fn(NodeId) -> String,
{
    let node = match args.as_slice() {
        [] => Some(context),
        [XPathValue::NodeSet(nodes)] => nodes.first().copied(),
        [XPathValue::StringList(_)] => None,
        [_] => return Err(format!("{}() argument must be a node-set", name)),
        _ => return Err(format!("{}() requires 0 or 1 arguments", name)),
    };
    Ok(XPathValue::String(node.map(f).unwrap_or_default()))
}

// Node Set Functions

fn fn_count(args: Vec<XPathValue>) -> Result<XPathValue, String> {
    match args.as_slice() {
        [XPathValue::NodeSet(nodes)] => Ok(XPathValue::Number(nodes.len() as f64)),
        [XPathValue::StringList(values)] => Ok(XPathValue::Number(values.len() as f64)),
        [_] => Err("count() argument must be a node-set".to_string()),
        _ => Err("count() requires exactly 1 argument".to_string()),
    }
}

// String Functions

fn fn_concat<D: DocumentAccess + ?Sized>(
    args: Vec<XPathValue>,
    doc: &D,
) -> Result<XPathValue, String> {
    if args.len() < 2 {
        return Err("concat() requires at least 2 arguments".to_string());
    }
    let result: String = args.iter().map(|a| a.string_in(doc)).collect();
    Ok(XPathValue::String(result))
}

/// Characters at 1-based positions p with start <= p < start + len, where
/// both bounds are rounded first
fn fn_substring<D: DocumentAccess + ?Sized>(
    args: Vec<XPathValue>,
    doc: &D,
) -> Result<XPathValue, String> {
    if args.len() < 2 || args.len() > 3 {
        return Err("substring() requires 2 or 3 arguments".to_string());
    }
    let s = args[0].string_in(doc);
    let start = xpath_round(args[1].number_in(doc));
    let end = match args.get(2) {
        Some(len) => start + xpath_round(len.number_in(doc)),
        None => f64::INFINITY,
    };

    let result: String = s
        .chars()
        .enumerate()
        .filter(|(i, _)| {
            let p = (*i + 1) as f64;
            p >= start && p < end
        })
        .map(|(_, c)| c)
        .collect();
    Ok(XPathValue::String(result))
}

fn fn_translate<D: DocumentAccess + ?Sized>(
    args: Vec<XPathValue>,
    doc: &D,
) -> Result<XPathValue, String> {
    if args.len() != 3 {
        return Err("translate() requires exactly 3 arguments".to_string());
    }

    let s = args[0].string_in(doc);
    let from: Vec<char> = args[1].string_in(doc).chars().collect();
    let to: Vec<char> = args[2].string_in(doc).chars().collect();

    let result: String = s
        .chars()
        .filter_map(|c| match from.iter().position(|&fc| fc == c) {
            Some(pos) => to.get(pos).copied(),
            None => Some(c),
        })
        .collect();

    Ok(XPathValue::String(result))
}

// Boolean Functions

fn fn_lang<D: DocumentAccess + ?Sized>(
    args: Vec<XPathValue>,
    doc: &D,
    context: NodeId,
) -> Result<XPathValue, String> {
    let target = one_arg("lang", &args)?.string_in(doc).to_lowercase();

    // Nearest xml:lang wins
    let mut node = Some(context);
    while let Some(id) = node {
        if let Some(lang) = doc.get_attribute(id, "xml:lang") {
            let lang = lang.to_lowercase();
            let matched = lang == target
                || (lang.starts_with(&target) && lang.as_bytes().get(target.len()) == Some(&b'-'));
            return Ok(XPathValue::Boolean(matched));
        }
        node = doc.parent_of(id);
    }
    Ok(XPathValue::Boolean(false))
}

// Number Functions

fn fn_sum<D: DocumentAccess + ?Sized>(
    args: Vec<XPathValue>,
    doc: &D,
) -> Result<XPathValue, String> {
    let values = one_arg("sum", &args)?
        .member_strings(doc)
        .ok_or_else(|| "sum() argument must be a node-set".to_string())?;
    Ok(XPathValue::Number(
        values.iter().map(|v| parse_number(v)).sum(),
    ))
}

/// Round half towards positive infinity
fn xpath_round(n: f64) -> f64 {
    if n.is_nan() || n.is_infinite() {
        n
    } else {
        (n + 0.5).floor()
    }
}
