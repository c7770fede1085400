use fanout_core::{ConfigBundle, ConfigTable, Namespace, TableEntry};
use fanout_state::codec;
use serde_json::{Map, Value, json};

/// What a publish would write, one object per namespace in publish order.
pub fn build(bundle: &ConfigBundle) -> anyhow::Result<Value> {
    let mut tables = Vec::new();
    for namespace in Namespace::PUBLISH_ORDER {
        let fields = match namespace {
            Namespace::Backends => encoded_fields(&bundle.backends)?,
            Namespace::Proxies => encoded_fields(&bundle.proxies)?,
            Namespace::Routes => encoded_fields(&bundle.routes)?,
        };
        tables.push(json!({
            "key": namespace.key(),
            "table": namespace.label(),
            "fields": fields,
        }));
    }
    Ok(Value::Array(tables))
}

pub fn print(bundle: &ConfigBundle) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(&build(bundle)?)?);
    Ok(())
}

// Re-parse the stored bytes so the plan shows exactly what goes on the wire.
fn encoded_fields<E: TableEntry>(table: &ConfigTable<E>) -> anyhow::Result<Map<String, Value>> {
    let mut fields = Map::new();
    for (field, value) in codec::encode_table(table)? {
        fields.insert(field, serde_json::from_slice(&value)?);
    }
    Ok(fields)
}
