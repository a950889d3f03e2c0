//! Templates shipped with form-designer.
//!
//! Files of the same name in a configured template directory take precedence.
//! Form templates expect a `form` (see `BaseForm::as_context`) and a
//! `form_definition` in the context.

/// Default plain-text body for notification mails.
pub const DATA_MESSAGE: &str = "txt/formdefinition/data_message.txt";
/// Full page wrapping a designed form.
pub const DETAIL: &str = "html/formdefinition/detail.html";
/// Fragment for embedding a designed form in another page.
pub const EMBEDDED: &str = "html/formdefinition/embedded.html";
/// Form rendered as paragraphs.
pub const FORM_AS_P: &str = "html/formdefinition/forms/as_p.html";
/// Form rendered as a table with one row per field.
pub const FORM_AS_TABLE: &str = "html/formdefinition/forms/as_table.html";
/// Form rendered as a table with labels in the header row.
pub const FORM_AS_TABLE_H: &str = "html/formdefinition/forms/as_table_h.html";
/// Form rendered as a list.
pub const FORM_AS_UL: &str = "html/formdefinition/forms/as_ul.html";

const DATA_MESSAGE_SOURCE: &str =
    "{% for field in data %}{{ field.label }}: {{ field.value }}\n{% endfor %}";

const DETAIL_SOURCE: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>{{ form_definition.display_name }}</title>
</head>
<body>
{% include "html/formdefinition/embedded.html" %}
</body>
</html>
"#;

const EMBEDDED_SOURCE: &str = r#"<div class="form-designer" id="form-{{ form_definition.name }}">
{% if form_definition.title %}<h2>{{ form_definition.title }}</h2>
{% endif %}{% if message %}<p class="{% if form_error %}error{% else %}success{% endif %}">{{ message }}</p>
{% endif %}{% include form_template %}
</div>
"#;

const FORM_OPEN: &str = r#"<form method="{{ form_definition.method|lower }}" action="{{ form_definition.action }}"{% if form.is_multipart %} enctype="multipart/form-data"{% endif %}>
{% if form.non_field_errors %}<ul class="errorlist">{% for error in form.non_field_errors %}<li>{{ error }}</li>{% endfor %}</ul>
{% endif %}{% for field in form.hidden_fields %}{{ field.widget }}{% endfor %}
"#;

const FORM_CLOSE: &str = r#"<input type="submit" value="{{ form_definition.submit_label|default:"Submit" }}">
</form>
"#;

const FORM_AS_P_BODY: &str = r#"{% for field in form.visible_fields %}{% if field.errors %}<ul class="errorlist">{% for error in field.errors %}<li>{{ error }}</li>{% endfor %}</ul>
{% endif %}<p>{{ field.label_tag }} {{ field.widget }}{% if field.help_text %}<span class="helptext">{{ field.help_text }}</span>{% endif %}</p>
{% endfor %}"#;

const FORM_AS_TABLE_BODY: &str = r#"<table>
{% for field in form.visible_fields %}<tr><th>{{ field.label_tag }}</th><td>{% if field.errors %}<ul class="errorlist">{% for error in field.errors %}<li>{{ error }}</li>{% endfor %}</ul>{% endif %}{{ field.widget }}{% if field.help_text %}<br><span class="helptext">{{ field.help_text }}</span>{% endif %}</td></tr>
{% endfor %}</table>
"#;

const FORM_AS_TABLE_H_BODY: &str = r#"<table>
<tr>{% for field in form.visible_fields %}<th>{{ field.label_tag }}</th>{% endfor %}</tr>
<tr>{% for field in form.visible_fields %}<td>{% if field.errors %}<ul class="errorlist">{% for error in field.errors %}<li>{{ error }}</li>{% endfor %}</ul>{% endif %}{{ field.widget }}</td>{% endfor %}</tr>
</table>
"#;

const FORM_AS_UL_BODY: &str = r#"<ul>
{% for field in form.visible_fields %}<li>{% if field.errors %}<ul class="errorlist">{% for error in field.errors %}<li>{{ error }}</li>{% endfor %}</ul>{% endif %}{{ field.label_tag }} {{ field.widget }}{% if field.help_text %}<span class="helptext">{{ field.help_text }}</span>{% endif %}</li>
{% endfor %}</ul>
"#;

/// Returns every built-in template as `(name, source)`.
pub fn templates() -> Vec<(&'static str, String)> {
    let form = |body: &str| format!("{FORM_OPEN}{body}{FORM_CLOSE}");
    vec![
        (DATA_MESSAGE, DATA_MESSAGE_SOURCE.to_string()),
        (DETAIL, DETAIL_SOURCE.to_string()),
        (EMBEDDED, EMBEDDED_SOURCE.to_string()),
        (FORM_AS_P, form(FORM_AS_P_BODY)),
        (FORM_AS_TABLE, form(FORM_AS_TABLE_BODY)),
        (FORM_AS_TABLE_H, form(FORM_AS_TABLE_H_BODY)),
        (FORM_AS_UL, form(FORM_AS_UL_BODY)),
    ]
}
