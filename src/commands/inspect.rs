// ABOUTME: Read-only commands: error classification and the phase catalog.
// ABOUTME: Neither command touches the provider.

use rollwright::classify::classify;
use rollwright::deploy::PhaseCatalog;
use rollwright::error::Result;
use rollwright::output::{Output, OutputMode};

pub fn classify_error(text: &str, context: &str, exit_code: i32, output: &Output) -> Result<()> {
    let classification = classify(text, context, exit_code);

    if output.mode() == OutputMode::Json {
        output.record("classification", &classification);
        return Ok(());
    }

    output.report(&format!(
        "error_code: {}\ncategory: {}\nsubtype: {}\nretryable: {}\nretry_delay: {}\nmax_retries: {}\nsuggested_action: {}",
        classification.error_code,
        classification.category,
        classification.subtype,
        classification.retryable,
        classification.retry_delay,
        classification.max_retries,
        classification.suggested_action,
    ));
    Ok(())
}

pub fn show_phases(catalog: &PhaseCatalog, output: &Output) -> Result<()> {
    if output.mode() == OutputMode::Json {
        let phases: Vec<_> = catalog.iter().collect();
        output.record("phases", &phases);
        return Ok(());
    }

    for spec in catalog.iter() {
        output.report(&format!(
            "{}. {:<15} {:>5}s  {}  {}",
            spec.order,
            spec.name.as_str(),
            spec.timeout_seconds(),
            if spec.required { "required" } else { "optional" },
            spec.description
        ));
    }
    Ok(())
}
