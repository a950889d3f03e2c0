//! Building the runtime form of a [`FormDefinition`].

use std::collections::BTreeMap;

use form_designer_core::{FormDesignerError, FormDesignerSettings, QueryDict};
use form_designer_forms::{BaseForm, FormFieldDef, FormFieldType, WidgetType};

use crate::definition::FormDefinition;
use crate::translation::ChoiceModelRegistry;

/// Builds the form for `definition`: one field per field record, ordered by
/// position, followed by the hidden submit flag.
///
/// With `initial`, fields present in the query take their initial values
/// from it; multi-valued fields take every value.
///
/// # Errors
///
/// Returns `ImproperlyConfigured` if a field record cannot be translated.
pub fn build_form(
    definition: &FormDefinition,
    registry: &ChoiceModelRegistry,
    settings: &FormDesignerSettings,
    initial: Option<&QueryDict>,
) -> Result<BaseForm, FormDesignerError> {
    let mut records: Vec<_> = definition.fields.iter().collect();
    records.sort_by_key(|f| f.position);

    let mut fields = Vec::with_capacity(records.len() + 1);
    let mut initial_values = BTreeMap::new();
    for record in records {
        let field = record.form_field(registry)?;
        if let Some(values) = initial.and_then(|query| query.get_list(&record.name)) {
            let values = if field.field_type.is_multi_valued() {
                values.clone()
            } else {
                values.last().cloned().into_iter().collect()
            };
            initial_values.insert(record.name.clone(), values);
        }
        fields.push(field);
    }

    fields.push(submit_flag_field(definition.submit_flag_name(settings)));

    Ok(BaseForm::new(fields).with_initial(initial_values))
}

fn submit_flag_field(name: String) -> FormFieldDef {
    FormFieldDef::new(name, FormFieldType::Boolean)
        .required(false)
        .initial("1")
        .widget(WidgetType::HiddenInput)
}
