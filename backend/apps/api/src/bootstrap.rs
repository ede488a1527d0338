//! Startup Seeding
//!
//! Creates configured cities and the bootstrap administrator. Both steps are
//! idempotent so a restart against a persistent store changes nothing.

use std::sync::Arc;

use anyhow::Context;
use directory::DirectoryConfig;
use directory::application::ManageUsersUseCase;
use directory::application::validator::CreateUserInput;
use directory::domain::repository::{CityRepository, UserRepository};
use directory::domain::value_object::email::Email;

use crate::config::{BootstrapAdmin, BootstrapConfig};

pub async fn seed<R>(
    repo: &R,
    directory_config: &DirectoryConfig,
    bootstrap: &BootstrapConfig,
) -> anyhow::Result<()>
where
    R: UserRepository + CityRepository + Clone + Send + Sync + 'static,
{
    seed_cities(repo, &bootstrap.cities).await?;

    if let Some(admin) = &bootstrap.admin {
        seed_admin(repo, directory_config, admin).await?;
    }

    Ok(())
}

async fn seed_cities<R>(repo: &R, names: &[String]) -> anyhow::Result<()>
where
    R: CityRepository,
{
    if names.is_empty() {
        return Ok(());
    }

    let existing = repo.list_cities().await?;
    let mut created = 0usize;

    for name in names {
        if existing.iter().any(|city| &city.name == name) {
            continue;
        }
        repo.create_city(name).await?;
        created += 1;
    }

    tracing::info!(created, total = names.len(), "City seeding completed");
    Ok(())
}

async fn seed_admin<R>(
    repo: &R,
    directory_config: &DirectoryConfig,
    admin: &BootstrapAdmin,
) -> anyhow::Result<()>
where
    R: UserRepository + CityRepository + Clone + Send + Sync + 'static,
{
    let email = Email::new(admin.email.as_str()).context("BOOTSTRAP_ADMIN_EMAIL is invalid")?;

    if repo.find_by_email(email.as_str()).await?.is_some() {
        tracing::info!(email = %email, "Bootstrap admin already present");
        return Ok(());
    }

    let repo = Arc::new(repo.clone());
    let use_case = ManageUsersUseCase::new(
        repo.clone(),
        repo,
        Arc::new(directory_config.clone()),
    );

    let user = use_case
        .create(CreateUserInput {
            first_name: "Admin".to_string(),
            last_name: "Admin".to_string(),
            other_name: String::new(),
            email,
            password: admin.password.clone(),
            phone: String::new(),
            birthday: None,
            is_admin: true,
            city: None,
            additional_info: String::new(),
        })
        .await?;

    tracing::info!(user_id = %user.id, "Bootstrap admin created");
    Ok(())
}
