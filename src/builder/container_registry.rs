//! Container registry builder. Registries are global resources.

use tracing::{debug, info};

use super::{BuildResult, ContainerRegistryPorts, first_duplicate, require_id, require_non_blank};
use crate::config::Timing;
use crate::context::Context;
use crate::error::{ProvisionError, RemoteResultExt};
use crate::model::{
    AccessLevel, ContainerRegistryCreateRequest, ContainerRegistryUpdateRequest, Permission,
    RegistryUser,
};
use crate::types::{ResourceId, Tag};
use crate::wait::wait_until_ready;

/// A user to create on the registry.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct RegistryUserSpec {
    /// Login name.
    pub user_name: String,
    /// Password.
    pub password: String,
    /// Permission.
    pub permission: Permission,
}

impl RegistryUserSpec {
    fn to_user(&self) -> RegistryUser {
        RegistryUser {
            user_name: self.user_name.clone(),
            password: self.password.clone(),
            permission: self.permission,
        }
    }
}

/// Declarative description of a container registry.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ContainerRegistryBuilder {
    /// Existing registry targeted by [`ContainerRegistryBuilder::update`].
    pub id: ResourceId,
    /// Display name.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Tags.
    pub tags: Vec<Tag>,
    /// Icon reference.
    pub icon_id: ResourceId,
    /// Visibility.
    pub access_level: AccessLevel,
    /// Subdomain the registry is served under; fixed after creation.
    pub subdomain_label: String,
    /// Custom domain.
    pub virtual_domain: Option<String>,
    /// Users.
    pub users: Vec<RegistryUserSpec>,
    /// Waits.
    pub timing: Timing,
}

impl ContainerRegistryBuilder {
    /// Checks the parameters. Registry validation needs no remote lookup.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::Validation`] for blank names, blank
    /// credentials and duplicate users.
    pub fn validate(&self) -> Result<(), ProvisionError> {
        require_non_blank("container registry", "name", &self.name)?;
        require_non_blank(
            "container registry",
            "subdomain label",
            &self.subdomain_label,
        )?;
        for user in &self.users {
            require_non_blank("container registry", "user name", &user.user_name)?;
            require_non_blank("container registry", "user password", &user.password)?;
        }
        if let Some(name) = first_duplicate(self.users.iter().map(|user| user.user_name.as_str())) {
            return Err(ProvisionError::validation(
                "container registry",
                format!("user {name} is listed twice"),
            ));
        }
        Ok(())
    }

    /// Creates the registry, waits until it is available, and adds its
    /// users.
    ///
    /// # Errors
    ///
    /// Returns every error of [`ContainerRegistryBuilder::validate`], the
    /// first failed remote call, and wait errors.
    pub async fn build<A>(&self, ctx: &Context, api: &A) -> Result<BuildResult, ProvisionError>
    where
        A: ContainerRegistryPorts + ?Sized,
    {
        self.validate()?;
        let request = ContainerRegistryCreateRequest {
            name: self.name.clone(),
            description: self.description.clone(),
            tags: self.tags.clone(),
            icon_id: self.icon_id,
            access_level: self.access_level,
            subdomain_label: self.subdomain_label.clone(),
            virtual_domain: self.virtual_domain.clone(),
        };
        let created = api
            .create_container_registry(ctx, &request)
            .await
            .during("create container registry")?;
        let id = created.id;
        debug!(registry_id = %id, "container registry created");
        wait_until_ready(
            ctx,
            "container registry",
            id,
            move || api.read_container_registry(ctx, id),
            self.timing.wait,
        )
        .await?;
        for user in &self.users {
            api.add_registry_user(ctx, id, &user.to_user())
                .await
                .during("add registry user")?;
        }
        info!(registry_id = %id, users = self.users.len(), "container registry ready");
        Ok(BuildResult::with_id(id))
    }

    /// Updates metadata and visibility of the existing registry, adds the
    /// users it lacks, and deletes the users no longer listed.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::Validation`] when no existing registry is
    /// set or the parameters are unusable, and the first failed remote call.
    pub async fn update<A>(&self, ctx: &Context, api: &A) -> Result<BuildResult, ProvisionError>
    where
        A: ContainerRegistryPorts + ?Sized,
    {
        require_id("container registry", "id", self.id)?;
        self.validate()?;
        let request = ContainerRegistryUpdateRequest {
            name: self.name.clone(),
            description: self.description.clone(),
            tags: self.tags.clone(),
            icon_id: self.icon_id,
            access_level: self.access_level,
            virtual_domain: self.virtual_domain.clone(),
        };
        let current = api
            .update_container_registry(ctx, self.id, &request)
            .await
            .during("update container registry")?;

        for user in self
            .users
            .iter()
            .filter(|user| !current.user_names.contains(&user.user_name))
        {
            api.add_registry_user(ctx, self.id, &user.to_user())
                .await
                .during("add registry user")?;
            debug!(registry_id = %self.id, user = %user.user_name, "registry user added");
        }
        for name in current
            .user_names
            .iter()
            .filter(|name| !self.users.iter().any(|user| &user.user_name == *name))
        {
            api.delete_registry_user(ctx, self.id, name)
                .await
                .during("delete registry user")?;
            debug!(registry_id = %self.id, user = %name, "registry user deleted");
        }
        info!(registry_id = %self.id, "container registry updated");
        Ok(BuildResult::with_id(self.id))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use rstest::{fixture, rstest};

    use super::*;
    use crate::test_support::FakeCloud;

    #[fixture]
    fn cloud() -> FakeCloud {
        FakeCloud::new()
    }

    fn user(name: &str) -> RegistryUserSpec {
        RegistryUserSpec {
            user_name: name.to_owned(),
            password: String::from("correct-horse"),
            permission: Permission::ReadWrite,
        }
    }

    fn registry() -> ContainerRegistryBuilder {
        ContainerRegistryBuilder {
            name: String::from("images"),
            subdomain_label: String::from("acme-images"),
            users: vec![user("ci"), user("deploy")],
            timing: Timing::uniform(Duration::from_millis(10), Duration::from_secs(5)),
            ..ContainerRegistryBuilder::default()
        }
    }

    #[rstest]
    #[tokio::test(start_paused = true)]
    async fn build_adds_users_once_ready(cloud: FakeCloud) {
        let result = registry()
            .build(&Context::new(), &cloud)
            .await
            .expect("build registry");
        let record = cloud.registry(result.id).expect("registry exists");
        assert_eq!(record.user_names, vec!["ci", "deploy"]);
        assert_eq!(
            cloud.mutating_calls(),
            vec![
                "create_container_registry",
                "add_registry_user",
                "add_registry_user"
            ]
        );
    }

    #[rstest]
    #[case::blank_subdomain(ContainerRegistryBuilder {
        subdomain_label: String::from(" "),
        ..registry()
    })]
    #[case::duplicate_user(ContainerRegistryBuilder {
        users: vec![user("ci"), user("ci")],
        ..registry()
    })]
    #[case::blank_password(ContainerRegistryBuilder {
        users: vec![RegistryUserSpec { password: String::new(), ..user("ci") }],
        ..registry()
    })]
    fn invalid_registries_are_rejected(#[case] builder: ContainerRegistryBuilder) {
        assert!(matches!(
            builder.validate(),
            Err(ProvisionError::Validation { .. })
        ));
    }

    #[rstest]
    #[tokio::test(start_paused = true)]
    async fn update_reconciles_users(cloud: FakeCloud) {
        let ctx = Context::new();
        let created = registry()
            .build(&ctx, &cloud)
            .await
            .expect("build registry");
        cloud.clear_calls();

        let builder = ContainerRegistryBuilder {
            id: created.id,
            access_level: AccessLevel::ReadOnly,
            users: vec![user("deploy"), user("audit")],
            ..registry()
        };
        builder.update(&ctx, &cloud).await.expect("update registry");

        let record = cloud.registry(created.id).expect("registry exists");
        assert_eq!(record.access_level, AccessLevel::ReadOnly);
        assert_eq!(record.user_names, vec!["deploy", "audit"]);
        assert_eq!(
            cloud.mutating_calls(),
            vec![
                "update_container_registry",
                "add_registry_user",
                "delete_registry_user"
            ]
        );
    }
}
