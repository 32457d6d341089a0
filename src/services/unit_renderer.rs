//! Renders a machine's role-specific unit set from templates.

use tracing::debug;

use crate::domain::models::{
    instance_name, MachineRecord, TemplateSet, UnitSpec, ADDRESS_PLACEHOLDER, ID_PLACEHOLDER,
};

/// Pure renderer over a fixed template set
#[derive(Debug, Clone, Default)]
pub struct UnitRenderer {
    templates: TemplateSet,
}

impl UnitRenderer {
    /// Renderer over a loaded template set
    pub const fn new(templates: TemplateSet) -> Self {
        Self { templates }
    }

    /// Render every unit for the machine's role.
    ///
    /// Only the machine identifier and public address placeholders are
    /// substituted. An unassigned machine renders nothing.
    pub fn render(&self, machine: &MachineRecord) -> Vec<UnitSpec> {
        let units: Vec<UnitSpec> = self
            .templates
            .for_role(machine.role)
            .iter()
            .map(|template| {
                let content = substitute(&template.content, &machine.id, &machine.public_address);
                UnitSpec::new(
                    instance_name(template.entry.file_name, &machine.id),
                    template.entry.group,
                    content.into_bytes(),
                )
            })
            .collect();

        debug!(
            machine_id = %machine.id,
            role = %machine.role,
            units = units.len(),
            "rendered units"
        );
        units
    }
}

/// Replace both placeholders verbatim, everywhere they occur
pub fn substitute(template: &str, machine_id: &str, public_address: &str) -> String {
    template
        .replace(ID_PLACEHOLDER, machine_id)
        .replace(ADDRESS_PLACEHOLDER, public_address)
}
