//! `edsum patients` — List known patients.

use crate::runtime::{display_time, load_config, open_store};
use edsum_store::PatientDirectory;
use std::time::Duration;

pub async fn run(limit: Option<usize>) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;
    let store = open_store(&config).await?;
    let directory = PatientDirectory::new(
        store,
        Duration::from_secs(config.directory.cache_ttl_secs),
    );

    let patients = directory.list().await?;
    if patients.is_empty() {
        println!("No patients found in the {} store.", config.store.backend);
        return Ok(());
    }

    println!(
        "{:<16} {:<17} {:<17} {:>7}",
        "PATIENT", "FIRST RECORD", "LAST RECORD", "RECORDS"
    );
    for patient in patients.iter().take(limit.unwrap_or(usize::MAX)) {
        println!(
            "{:<16} {:<17} {:<17} {:>7}",
            patient.patient_id.as_str(),
            display_time(patient.first_record.as_ref()),
            display_time(patient.last_record.as_ref()),
            patient.record_count
        );
    }
    if let Some(limit) = limit.filter(|l| *l < patients.len()) {
        println!("… {} more", patients.len() - limit);
    }

    Ok(())
}
