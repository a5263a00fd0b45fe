//! Bulk persistence of extracted IFC entities (`(modelVersionId,
//! entityLabel)` uniqueness, dedup-by-last-occurrence
//! within a single import).

use uuid::Uuid;

use super::model::{IfcElement, IfcProperty, IfcPropertySet, IfcQuantity, IfcQuantitySet};
use super::Store;
use crate::error::AppError;

/// One extracted element plus its property/quantity sets, as produced by
/// the property extractor (conversion::ExtractedProperties).
pub struct ExtractedElement {
    pub entity_label: i64,
    pub global_id: Option<String>,
    pub name: Option<String>,
    pub type_name: Option<String>,
    pub description: Option<String>,
    pub object_type: Option<String>,
    pub type_object_name: Option<String>,
    pub type_object_type: Option<String>,
    pub property_sets: Vec<ExtractedPropertySet>,
    pub quantity_sets: Vec<ExtractedQuantitySet>,
}

pub struct ExtractedPropertySet {
    pub name: String,
    pub global_id: Option<String>,
    pub is_type_property_set: bool,
    pub properties: Vec<ExtractedProperty>,
}

pub struct ExtractedProperty {
    pub name: String,
    pub value: Option<String>,
    pub value_type: String,
    pub unit: Option<String>,
}

pub struct ExtractedQuantitySet {
    pub name: String,
    pub global_id: Option<String>,
    pub quantities: Vec<ExtractedQuantity>,
}

pub struct ExtractedQuantity {
    pub name: String,
    pub value: Option<f64>,
    pub value_type: String,
    pub unit: Option<String>,
}

impl Store {
    /// Inserts every element (and its sets/entries) for one model version
    /// in a single transaction. Dedups by `entity_label`, keeping the last
    /// occurrence, before any row is written.
    pub async fn bulk_insert_ifc_elements(&self, model_version_id: Uuid, mut elements: Vec<ExtractedElement>) -> Result<usize, AppError> {
        let mut by_label: std::collections::HashMap<i64, ExtractedElement> = std::collections::HashMap::new();
        while let Some(el) = elements.pop() {
            by_label.entry(el.entity_label).or_insert(el);
        }
        let deduped: Vec<ExtractedElement> = by_label.into_values().collect();
        let count = deduped.len();

        let mut tx = self.pool().begin().await?;
        for el in deduped {
            let element = IfcElement {
                id: Uuid::new_v4(),
                model_version_id,
                entity_label: el.entity_label,
                global_id: el.global_id,
                name: el.name,
                type_name: el.type_name,
                description: el.description,
                object_type: el.object_type,
                type_object_name: el.type_object_name,
                type_object_type: el.type_object_type,
            };
            sqlx::query(
                "INSERT INTO ifc_elements (id, model_version_id, entity_label, global_id, name, type_name, \
                 description, object_type, type_object_name, type_object_type) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(element.id)
            .bind(element.model_version_id)
            .bind(element.entity_label)
            .bind(&element.global_id)
            .bind(&element.name)
            .bind(&element.type_name)
            .bind(&element.description)
            .bind(&element.object_type)
            .bind(&element.type_object_name)
            .bind(&element.type_object_type)
            .execute(&mut *tx)
            .await?;

            for pset in el.property_sets {
                let pset_row = IfcPropertySet {
                    id: Uuid::new_v4(),
                    element_id: element.id,
                    name: pset.name,
                    global_id: pset.global_id,
                    is_type_property_set: pset.is_type_property_set,
                };
                sqlx::query(
                    "INSERT INTO ifc_property_sets (id, element_id, name, global_id, is_type_property_set) VALUES (?, ?, ?, ?, ?)",
                )
                .bind(pset_row.id)
                .bind(pset_row.element_id)
                .bind(&pset_row.name)
                .bind(&pset_row.global_id)
                .bind(pset_row.is_type_property_set)
                .execute(&mut *tx)
                .await?;

                for prop in pset.properties {
                    let prop_row = IfcProperty {
                        id: Uuid::new_v4(),
                        property_set_id: pset_row.id,
                        name: prop.name,
                        value: prop.value,
                        value_type: prop.value_type,
                        unit: prop.unit,
                    };
                    sqlx::query(
                        "INSERT INTO ifc_properties (id, property_set_id, name, value, value_type, unit) VALUES (?, ?, ?, ?, ?, ?)",
                    )
                    .bind(prop_row.id)
                    .bind(prop_row.property_set_id)
                    .bind(&prop_row.name)
                    .bind(&prop_row.value)
                    .bind(&prop_row.value_type)
                    .bind(&prop_row.unit)
                    .execute(&mut *tx)
                    .await?;
                }
            }

            for qset in el.quantity_sets {
                let qset_row = IfcQuantitySet {
                    id: Uuid::new_v4(),
                    element_id: element.id,
                    name: qset.name,
                    global_id: qset.global_id,
                };
                sqlx::query("INSERT INTO ifc_quantity_sets (id, element_id, name, global_id) VALUES (?, ?, ?, ?)")
                    .bind(qset_row.id)
                    .bind(qset_row.element_id)
                    .bind(&qset_row.name)
                    .bind(&qset_row.global_id)
                    .execute(&mut *tx)
                    .await?;

                for qty in qset.quantities {
                    let qty_row = IfcQuantity {
                        id: Uuid::new_v4(),
                        quantity_set_id: qset_row.id,
                        name: qty.name,
                        value: qty.value,
                        value_type: qty.value_type,
                        unit: qty.unit,
                    };
                    sqlx::query(
                        "INSERT INTO ifc_quantities (id, quantity_set_id, name, value, value_type, unit) VALUES (?, ?, ?, ?, ?, ?)",
                    )
                    .bind(qty_row.id)
                    .bind(qty_row.quantity_set_id)
                    .bind(&qty_row.name)
                    .bind(qty_row.value)
                    .bind(&qty_row.value_type)
                    .bind(&qty_row.unit)
                    .execute(&mut *tx)
                    .await?;
                }
            }
        }
        tx.commit().await?;
        Ok(count)
    }

    /// `label` is tried as the integer `entityLabel` first; a non-numeric
    /// value falls back to a `globalId` lookup, kept as a compatibility
    /// alias for callers that only have the GUID handy.
    pub async fn query_elements(&self, model_version_id: Uuid, label: Option<&str>, page: i64, page_size: i64) -> Result<(Vec<IfcElement>, i64), AppError> {
        match label {
            None => {
                let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM ifc_elements WHERE model_version_id = ?")
                    .bind(model_version_id)
                    .fetch_one(self.pool())
                    .await?;
                let rows = sqlx::query_as::<_, IfcElement>(
                    "SELECT * FROM ifc_elements WHERE model_version_id = ? ORDER BY entity_label LIMIT ? OFFSET ?",
                )
                .bind(model_version_id)
                .bind(page_size)
                .bind((page - 1) * page_size)
                .fetch_all(self.pool())
                .await?;
                Ok((rows, total))
            }
            Some(raw) => {
                if let Ok(entity_label) = raw.parse::<i64>() {
                    let rows = sqlx::query_as::<_, IfcElement>(
                        "SELECT * FROM ifc_elements WHERE model_version_id = ? AND entity_label = ?",
                    )
                    .bind(model_version_id)
                    .bind(entity_label)
                    .fetch_all(self.pool())
                    .await?;
                    let total = rows.len() as i64;
                    Ok((rows, total))
                } else {
                    let rows = sqlx::query_as::<_, IfcElement>(
                        "SELECT * FROM ifc_elements WHERE model_version_id = ? AND global_id = ?",
                    )
                    .bind(model_version_id)
                    .bind(raw)
                    .fetch_all(self.pool())
                    .await?;
                    let total = rows.len() as i64;
                    Ok((rows, total))
                }
            }
        }
    }
}
