use driftql_core::{
    Change, Error, ExecQuerier, Result,
    driver::Normalizer,
    inspect::{InspectOptions, Inspector as _},
    migrate::{PlanApplier as _, PlanOptions},
    schema::{Realm, Schema},
};
use tracing::debug;

use crate::MySql;

/// Roundtrips a desired model through a scratch schema on the dev
/// connection so dialect-chosen defaults (implicit collations, display
/// widths, default precisions) come back exactly as the server spells them.
impl Normalizer for MySql {
    fn normalize_schema(&self, dev: &mut dyn ExecQuerier, schema: &Schema) -> Result<Schema> {
        let twin = twin_name(&schema.name);
        dev.exec(&format!("CREATE DATABASE `{twin}`"), &[])?;
        debug!(twin = %twin, "normalizing through dev schema");

        let result = self.roundtrip(dev, schema, &twin);
        let cleanup = dev.exec(&format!("DROP DATABASE IF EXISTS `{twin}`"), &[]);

        let mut normalized = result?;
        cleanup?;
        normalized.name = schema.name.clone();
        for table in &mut normalized.tables {
            table.schema = Some(schema.name.clone());
        }
        Ok(normalized)
    }

    fn normalize_realm(&self, dev: &mut dyn ExecQuerier, realm: &Realm) -> Result<Realm> {
        let mut normalized = Realm::new();
        normalized.attrs = realm.attrs.clone();
        for schema in &realm.schemas {
            normalized.schemas.push(self.normalize_schema(dev, schema)?);
        }
        Ok(normalized)
    }
}

impl MySql {
    fn roundtrip(
        &self,
        dev: &mut dyn ExecQuerier,
        schema: &Schema,
        twin: &str,
    ) -> Result<Schema> {
        let mut changes = Vec::with_capacity(schema.tables.len() + schema.views.len());
        for table in &schema.tables {
            changes.push(Change::AddTable(table.clone()));
        }
        for view in &schema.views {
            changes.push(Change::AddView(view.clone()));
        }

        let plan = self.plan_changes(
            "normalize",
            &changes,
            &PlanOptions {
                schema_qualifier: Some(twin.to_string()),
            },
        )?;
        for stmt in &plan.stmts {
            dev.exec(&stmt.cmd, &[])?;
        }

        self.inspect_schema(dev, Some(twin), &InspectOptions::default())
            .map_err(|error| {
                if matches!(error.root(), Error::NotExist { .. }) {
                    Error::Internal(format!(
                        "dev schema {twin:?} vanished during normalization"
                    ))
                } else {
                    error
                }
            })
    }
}

/// Scratch schema names carry enough entropy to coexist with concurrent
/// normalizations against the same dev database.
fn twin_name(schema: &str) -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|elapsed| elapsed.subsec_nanos())
        .unwrap_or(0);
    format!("atlas_twin_{schema}_{}_{nanos:x}", std::process::id())
}
