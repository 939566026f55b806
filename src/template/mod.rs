//! Text templates over serializable data.
//!
//! A small Go-style template language: `{{.Field.Sub}}` looks up fields,
//! `{{json .}}` calls a function, `|` pipes a value into the next function as
//! its last argument, and `{{-` / `-}}` trim surrounding whitespace.
//! Data is serialized to a JSON tree before execution and field names are
//! matched case-insensitively, so `{{.Name}}` reads the `name` key.
//!
//! Available functions: `json`, `yaml`, `indent [N]`, `upper`, `lower`.

mod exec;
mod funcs;
mod parse;

use serde::Serialize;
use serde_json::Value;

use crate::core::error::TemplateError;

use parse::Node;

/// A parsed template, reusable across many executions
#[derive(Debug, Clone)]
pub struct Template {
    source: String,
    nodes: Vec<Node>,
}

impl Template {
    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        Ok(Self {
            source: source.to_string(),
            nodes: parse::parse(source)?,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn execute<T: Serialize + ?Sized>(&self, data: &T) -> Result<String, TemplateError> {
        let value = serde_json::to_value(data)
            .map_err(|e| TemplateError::Execute(format!("cannot serialize data: {}", e)))?;
        self.execute_value(&value)
    }

    pub fn execute_value(&self, data: &Value) -> Result<String, TemplateError> {
        exec::execute(&self.nodes, data)
    }
}

/// Parse and execute `template` against `data` in one step
pub fn render<T: Serialize + ?Sized>(template: &str, data: &T) -> Result<String, TemplateError> {
    Template::parse(template)?.execute(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn data() -> Value {
        json!({
            "name": "default",
            "sshLocalPort": 60022,
            "config": { "message": "line one\nline two" },
            "networks": ["shared", "bridged"],
            "hostOS": "linux",
        })
    }

    #[test]
    fn renders_fields_case_insensitively() {
        let out = render("ssh -p {{.SSHLocalPort}} {{.Name}}@{{.hostOS}}", &data()).unwrap();
        assert_eq!(out, "ssh -p 60022 default@linux");
    }

    #[test]
    fn exact_key_wins_over_case_insensitive_match() {
        let data = json!({ "Name": "upper", "name": "lower" });
        assert_eq!(render("{{.name}}", &data).unwrap(), "lower");
        assert_eq!(render("{{.Name}}", &data).unwrap(), "upper");
    }

    #[test]
    fn json_of_dot_is_compact() {
        let data = json!({ "name": "default", "cpus": 4 });
        assert_eq!(
            render("{{json .}}", &data).unwrap(),
            r#"{"cpus":4,"name":"default"}"#
        );
    }

    #[test]
    fn yaml_emits_a_document() {
        let data = json!({ "name": "default" });
        assert_eq!(render("{{yaml .}}", &data).unwrap(), "---\nname: default");
    }

    #[test]
    fn pipelines_feed_last_argument() {
        assert_eq!(
            render("{{.Config.Message | indent 4}}", &data()).unwrap(),
            "    line one\n    line two"
        );
        assert_eq!(render("{{.Name | upper}}", &data()).unwrap(), "DEFAULT");
        assert_eq!(render(r#"{{lower "ABC"}}"#, &data()).unwrap(), "abc");
    }

    #[test]
    fn prints_collections_like_go() {
        assert_eq!(render("{{.Networks}}", &data()).unwrap(), "[shared bridged]");
    }

    #[test]
    fn undefined_field_is_an_execution_error() {
        let err = render("{{.Nope}}", &data()).unwrap_err();
        assert_eq!(
            err,
            TemplateError::Execute("can't evaluate field Nope".to_string())
        );
    }

    #[test]
    fn field_of_scalar_is_an_execution_error() {
        assert!(matches!(
            render("{{.Name.First}}", &data()),
            Err(TemplateError::Execute(_))
        ));
    }

    #[test]
    fn wrong_arity_is_an_execution_error() {
        assert!(matches!(
            render("{{json .Name .Name}}", &data()),
            Err(TemplateError::Execute(_))
        ));
    }

    #[test]
    fn oversized_indent_is_an_execution_error() {
        let err = render("{{indent 9223372036854775807 .name}}", &data()).unwrap_err();
        assert_eq!(
            err,
            TemplateError::Execute("indent: width 9223372036854775807 too large".to_string())
        );
        assert_eq!(render("{{indent 1024 .name}}", &data()).unwrap().len(), 1024 + 7);
    }

    #[test]
    fn plain_text_passes_through() {
        assert_eq!(render("no actions here", &data()).unwrap(), "no actions here");
        assert_eq!(render("", &data()).unwrap(), "");
    }

    #[test]
    fn parsed_template_is_reusable() {
        let tmpl = Template::parse("{{.name}}").unwrap();
        assert_eq!(tmpl.source(), "{{.name}}");
        assert_eq!(tmpl.execute(&json!({"name": "a"})).unwrap(), "a");
        assert_eq!(tmpl.execute(&json!({"name": "b"})).unwrap(), "b");
    }
}
