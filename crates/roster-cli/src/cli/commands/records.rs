//! Student record command handlers.

use anyhow::Result;
use comfy_table::{ContentArrangement, Table};
use roster_app::update::{MSG_ADDED, MSG_DELETED, MSG_UPDATED};
use roster_app::{Action, Coordinator};
use roster_types::{RecordId, School, StudentFields, StudentRecord};

use super::{Env, expect_message};

pub fn schools() {
    for school in School::all() {
        println!("{school}");
    }
}

pub async fn list(env: &Env) -> Result<()> {
    let app = env.open_signed_in().await?;
    let records = &app.view().records;
    if records.is_empty() {
        println!("No students");
    } else {
        println!("{}", roster_table(records));
    }
    Ok(())
}

pub async fn show(env: &Env, id: RecordId) -> Result<()> {
    let mut app = env.open_signed_in().await?;
    let record = find(&app, id)?;
    app.perform(Action::StartView(record)).await;

    match &app.view().selected {
        Some(record) => {
            println!("{}", detail_table(record));
            Ok(())
        }
        None => anyhow::bail!("No student with id {id}"),
    }
}

pub async fn add(env: &Env, fields: StudentFields) -> Result<()> {
    let mut app = env.open_signed_in().await?;
    app.perform(Action::StartAdd).await;
    app.perform(Action::Submit(fields)).await;
    expect_message(&app, MSG_ADDED)
}

/// Pre-fills the form from the stored record, lets `overrides` change it, then submits.
pub async fn edit(
    env: &Env,
    id: RecordId,
    overrides: impl FnOnce(&mut StudentFields),
) -> Result<()> {
    let mut app = env.open_signed_in().await?;
    let record = find(&app, id)?;
    app.perform(Action::StartEdit(record)).await;

    let mut draft = app.view().form.clone();
    overrides(&mut draft);
    app.perform(Action::Submit(draft)).await;
    expect_message(&app, MSG_UPDATED)
}

pub async fn delete(env: &Env, id: RecordId) -> Result<()> {
    let mut app = env.open_signed_in().await?;
    app.perform(Action::Remove(id)).await;
    expect_message(&app, MSG_DELETED)
}

fn find(app: &Coordinator, id: RecordId) -> Result<StudentRecord> {
    app.view()
        .records
        .iter()
        .find(|record| record.id == id)
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("No student with id {id}"))
}

fn roster_table(records: &[StudentRecord]) -> Table {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(["ID", "Name", "Phone", "Email", "School"]);
    for record in records {
        let fields = &record.fields;
        table.add_row([
            record.id.to_string(),
            fields.full_name(),
            fields.phone_number.clone(),
            fields.email.clone(),
            fields.school.to_string(),
        ]);
    }
    table
}

fn detail_table(record: &StudentRecord) -> Table {
    let fields = &record.fields;
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    for (label, value) in [
        ("ID", record.id.to_string()),
        ("First name", fields.first_name.clone()),
        ("Last name", fields.last_name.clone()),
        ("Father's name", fields.fathers_name.clone()),
        ("Mother's name", fields.mothers_name.clone()),
        ("Phone number", fields.phone_number.clone()),
        ("Email", fields.email.clone()),
        ("School", fields.school.to_string()),
    ] {
        table.add_row([label.to_string(), value]);
    }
    table
}
