//! Template execution against a JSON value tree

use serde_json::{Map, Value};

use crate::core::error::TemplateError;

use super::funcs;
use super::parse::{Command, Node, Operand, Pipeline};

pub(crate) fn execute(nodes: &[Node], data: &Value) -> Result<String, TemplateError> {
    let mut out = String::new();
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Action(pipeline) => out.push_str(&print_value(&eval_pipeline(pipeline, data)?)),
        }
    }
    Ok(out)
}

fn eval_pipeline(pipeline: &Pipeline, data: &Value) -> Result<Value, TemplateError> {
    let mut piped: Option<Value> = None;
    for command in &pipeline.commands {
        piped = Some(eval_command(command, data, piped)?);
    }
    piped.ok_or_else(|| TemplateError::Execute("empty pipeline".to_string()))
}

fn eval_command(
    command: &Command,
    data: &Value,
    piped: Option<Value>,
) -> Result<Value, TemplateError> {
    match command.operands.split_first() {
        Some((Operand::Func(name), rest)) => {
            let mut args = rest
                .iter()
                .map(|operand| eval_operand(operand, data))
                .collect::<Result<Vec<_>, _>>()?;
            args.extend(piped);
            funcs::call(name, args)
        }
        Some((operand, [])) => eval_operand(operand, data),
        _ => Err(TemplateError::Execute(
            "can't give argument to non-function".to_string(),
        )),
    }
}

fn eval_operand(operand: &Operand, data: &Value) -> Result<Value, TemplateError> {
    match operand {
        Operand::Dot => Ok(data.clone()),
        Operand::Field(path) => {
            let mut current = data;
            for name in path {
                current = field(current, name)?;
            }
            Ok(current.clone())
        }
        Operand::Str(s) => Ok(Value::String(s.clone())),
        Operand::Int(i) => Ok(Value::from(*i)),
        Operand::Bool(b) => Ok(Value::Bool(*b)),
        Operand::Func(name) => funcs::call(name, Vec::new()),
    }
}

/// Look up `name`, preferring an exact key and falling back to a case-insensitive match
fn field<'a>(value: &'a Value, name: &str) -> Result<&'a Value, TemplateError> {
    let Value::Object(map) = value else {
        return Err(TemplateError::Execute(format!(
            "can't evaluate field {} in type {}",
            name,
            type_name(value)
        )));
    };
    map.get(name)
        .or_else(|| find_ignore_case(map, name))
        .ok_or_else(|| TemplateError::Execute(format!("can't evaluate field {}", name)))
}

fn find_ignore_case<'a>(map: &'a Map<String, Value>, name: &str) -> Option<&'a Value> {
    map.iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, v)| v)
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "nil",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "slice",
        Value::Object(_) => "map",
    }
}

/// Render a value the way it appears in template output
pub(crate) fn print_value(value: &Value) -> String {
    match value {
        Value::Null => "<no value>".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Array(items) => {
            let items: Vec<String> = items.iter().map(print_value).collect();
            format!("[{}]", items.join(" "))
        }
        Value::Object(map) => {
            let entries: Vec<String> = map
                .iter()
                .map(|(k, v)| format!("{}:{}", k, print_value(v)))
                .collect();
            format!("map[{}]", entries.join(" "))
        }
    }
}
