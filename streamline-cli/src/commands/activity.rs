use std::path::Path;

use anyhow::{bail, Context, Result};
use streamline::{
    annotate::annotatable,
    domain::{Activity, ActivityStatus, ImageUpload, Location, NewActivity},
    lifecycle::{
        awaiting_response, find_activity, find_engineer, respond_to_assignment, review_activity,
        submit_activity, EngineerDecision, OfficerDecision,
    },
    planner::PlannerFilter,
    roles::{Role, Screen},
};

use super::{plan::print_activity, Env, UserContext};
use crate::cli::{
    ActivityCommand, ActivityFilterArgs, AddActivityArgs, RespondArgs, ReviewActivityArgs,
};

pub async fn activities(env: &Env, args: ActivityFilterArgs) -> Result<()> {
    let role = env.authorize(
        "activities",
        &[
            Screen::ActivityList,
            Screen::ActivityManagement,
            Screen::EngineerActivities,
        ],
    )?;
    let backend = env.backend()?;

    let activities = match role {
        Role::ResponsiblePerson => backend.own_activities().await,
        Role::SiteEngineer => backend.assigned_activities().await,
        _ => backend.managed_activities().await,
    }
    .user_context("Failed to load activities")?;

    let rows: Vec<&Activity> = if role == Role::SiteEngineer {
        annotatable(&activities)
    } else {
        activities.iter().collect()
    };
    let filter = PlannerFilter::from(args);
    let rows: Vec<&Activity> = rows.into_iter().filter(|a| filter.matches(a)).collect();

    if rows.is_empty() {
        println!("No activities found.");
        return Ok(());
    }
    for activity in rows {
        print_activity(activity, None);
    }
    Ok(())
}

pub async fn activity(env: &Env, command: ActivityCommand) -> Result<()> {
    match command {
        ActivityCommand::Add(args) => add(env, args).await,
        ActivityCommand::Review(args) => review(env, args).await,
        ActivityCommand::Respond(args) => respond(env, args).await,
        ActivityCommand::Engineers => engineers(env).await,
    }
}

async fn add(env: &Env, args: AddActivityArgs) -> Result<()> {
    let role = env.authorize("activity add", &[Screen::AddActivity])?;
    if args.assign.is_some() && role != Role::DevelopmentOfficer {
        bail!("Only a Development Officer can assign an engineer.");
    }
    let backend = env.backend()?;

    let mut activity = NewActivity::new(
        args.description,
        Location {
            province: args.province,
            district: args.district,
            zone: args.zone,
        },
    );
    activity.component = args.component;
    activity.subcomponent = args.subcomponent;
    if let Some(engineer_id) = args.assign {
        let engineers = backend
            .engineers()
            .await
            .user_context("Failed to load engineers")?;
        find_engineer(&engineers, engineer_id).user_context("Cannot assign engineer")?;
        activity.status = ActivityStatus::Approved;
        activity.assigned_engineer_id = Some(engineer_id);
    }
    for path in &args.images {
        activity.images.push(read_image(path)?);
    }

    submit_activity(backend.as_ref(), &activity)
        .await
        .user_context("Failed to add activity")?;
    println!(
        "Activity added as {} with {} image(s).",
        activity.status,
        activity.images.len()
    );
    Ok(())
}

fn read_image(path: &Path) -> Result<ImageUpload> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    Ok(ImageUpload { file_name, bytes })
}

async fn review(env: &Env, args: ReviewActivityArgs) -> Result<()> {
    env.authorize("activity review", &[Screen::ActivityManagement])?;
    let backend = env.backend()?;

    let activities = backend
        .managed_activities()
        .await
        .user_context("Failed to load activities")?;
    let activity = find_activity(&activities, args.id).user_context("Cannot review activity")?;

    let decision = match (args.assign, args.reject) {
        (Some(engineer_id), _) => {
            let engineers = backend
                .engineers()
                .await
                .user_context("Failed to load engineers")?;
            let engineer =
                find_engineer(&engineers, engineer_id).user_context("Cannot assign engineer")?;
            println!("Assigning {}", engineer.label());
            OfficerDecision::Approve {
                engineer_id,
                component: args.component,
                subcomponent: args.subcomponent,
                description: args.description,
            }
        }
        (None, Some(reason)) => OfficerDecision::Reject { reason },
        (None, None) => bail!("Pass --assign <ENGINEER_ID> or --reject <REASON>."),
    };

    let status = review_activity(backend.as_ref(), activity, &decision)
        .await
        .user_context(&format!("Failed to review activity {}", args.id))?;
    println!("Activity {} -> {}", args.id, status);
    Ok(())
}

async fn respond(env: &Env, args: RespondArgs) -> Result<()> {
    env.authorize("activity respond", &[Screen::EngineerActivities])?;
    let backend = env.backend()?;

    let assigned = backend
        .assigned_activities()
        .await
        .user_context("Failed to load assigned activities")?;
    let waiting = awaiting_response(&assigned);
    let Some(activity) = waiting.iter().copied().find(|a| a.id == args.id) else {
        bail!("Activity {} is not waiting for your answer.", args.id);
    };

    let decision = match args.reject {
        Some(reason) => EngineerDecision::Reject { reason },
        None => EngineerDecision::Accept,
    };
    let status = respond_to_assignment(backend.as_ref(), activity, &decision)
        .await
        .user_context(&format!("Failed to answer activity {}", args.id))?;
    println!("Activity {} -> {}", args.id, status);
    Ok(())
}

async fn engineers(env: &Env) -> Result<()> {
    env.authorize(
        "activity engineers",
        &[Screen::ActivityManagement],
    )?;
    let backend = env.backend()?;

    let engineers = backend
        .engineers()
        .await
        .user_context("Failed to load engineers")?;
    if engineers.is_empty() {
        println!("No engineers registered.");
    }
    for engineer in &engineers {
        println!("{:>4}  {}", engineer.id, engineer.label());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_name_comes_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("site.jpg");
        std::fs::write(&path, b"jpeg").unwrap();

        let image = read_image(&path).unwrap();
        assert_eq!(image.file_name, "site.jpg");
        assert_eq!(image.bytes, b"jpeg");

        assert!(read_image(&dir.path().join("missing.jpg")).is_err());
    }
}
