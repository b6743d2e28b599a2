use anyhow::{Context, Result, bail};
use colored::Colorize;
use nerm_core::ResourceKind;
use nerm_export::ExportRequest;
use nerm_export::advanced_search::{self, ConditionRule};

use crate::cli::{SearchCreateArgs, SearchRunArgs};
use crate::config::ActiveEnvironment;
use crate::output::{print_json, print_success, print_table};

use super::{export, make_client};

pub async fn list(env: &ActiveEnvironment<'_>) -> Result<()> {
    let client = make_client(env)?;
    let searches = advanced_search::list(&client)
        .await
        .with_context(|| format!("Listing advanced searches on {} failed", env.host()))?;
    if searches.is_empty() {
        println!("No advanced searches found.");
        return Ok(());
    }
    let rows = searches.iter().map(|s| {
        vec![
            s.text("label").unwrap_or("-").to_string(),
            s.id().unwrap_or("-").to_string(),
        ]
    });
    print_table(&["Label", "ID"], rows);
    Ok(())
}

pub async fn show(env: &ActiveEnvironment<'_>, id: &str) -> Result<()> {
    let client = make_client(env)?;
    let search = advanced_search::show(&client, id).await?;
    print_json(&search)
}

pub async fn download(env: &ActiveEnvironment<'_>, id: &str) -> Result<()> {
    let client = make_client(env)?;
    let path = advanced_search::download(&client, env, id).await?;
    print_success(&format!("Saved advanced search {} to {}", id.cyan(), path.display()));
    Ok(())
}

pub async fn run(env: &ActiveEnvironment<'_>, args: &SearchRunArgs) -> Result<()> {
    let mut request = ExportRequest::new(ResourceKind::AdvancedSearchRun {
        search_id: args.id.clone(),
    });
    args.page.apply(&mut request);
    export(env, request, "profiles").await
}

pub async fn create(env: &ActiveEnvironment<'_>, args: &SearchCreateArgs) -> Result<()> {
    let client = make_client(env)?;
    if let Some(file) = &args.file {
        advanced_search::create_from_file(&client, file)
            .await
            .with_context(|| format!("Uploading {} failed", file.display()))?;
        print_success(&format!("Created advanced search from {}", file.display()));
        return Ok(());
    }

    let Some(label) = args.label.as_deref() else {
        bail!("--label or --file is required");
    };
    let rules = rules(args)?;
    let id = advanced_search::create_with_rules(&client, label, &rules).await?;
    print_success(&format!(
        "Created advanced search {} ({}) with {} rules",
        label.cyan(),
        id,
        rules.len()
    ));
    Ok(())
}

fn rules(args: &SearchCreateArgs) -> Result<Vec<ConditionRule>> {
    let mut rules = Vec::new();
    for status in &args.statuses {
        rules.push(ConditionRule::profile_status(status)?);
    }
    rules.extend(args.profile_types.iter().cloned().map(ConditionRule::ProfileType));
    rules.extend(args.risk_levels.iter().cloned().map(ConditionRule::Risk));
    Ok(rules)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rules_from_flags() {
        let args = SearchCreateArgs {
            file: None,
            label: Some("Leavers".to_string()),
            statuses: vec!["terminated".to_string()],
            profile_types: vec!["t-1".to_string()],
            risk_levels: vec!["high".to_string()],
        };
        let rules = rules(&args).unwrap();
        assert_eq!(
            rules,
            [
                ConditionRule::ProfileStatus("Terminated".to_string()),
                ConditionRule::ProfileType("t-1".to_string()),
                ConditionRule::Risk("high".to_string()),
            ]
        );
    }

    #[test]
    fn test_unknown_status_rejected() {
        let args = SearchCreateArgs {
            file: None,
            label: Some("x".to_string()),
            statuses: vec!["Retired".to_string()],
            profile_types: Vec::new(),
            risk_levels: Vec::new(),
        };
        assert!(rules(&args).is_err());
    }
}
