//! Project CI/CD variables on top of the four verbs.
//!
//! `project` is a numeric id or a full path such as `group/app`; it is
//! percent-encoded into the URL either way.

use crate::dispatcher::Dispatcher;
use crate::error::GitlabError;
use crate::http::Payload;
use crate::options::RequestOptions;
use crate::transport::Transport;
use crate::types::{NewVariable, ProjectVariable, VariableUpdate};

fn variables_path(project: &str) -> String {
    format!("/projects/{}/variables", urlencoding::encode(project))
}

fn variable_path(project: &str, key: &str) -> String {
    format!("{}/{}", variables_path(project), urlencoding::encode(key))
}

impl<T: Transport> Dispatcher<T> {
    /// First page of the project's variables (up to 100).
    pub fn project_variables(
        &self,
        project: &str,
        options: RequestOptions<'_>,
    ) -> Result<Vec<ProjectVariable>, GitlabError> {
        self.http_get(&variables_path(project), options.query("per_page", "100"))?
            .deserialize()
    }

    pub fn project_variable(
        &self,
        project: &str,
        key: &str,
        options: RequestOptions<'_>,
    ) -> Result<ProjectVariable, GitlabError> {
        self.http_get(&variable_path(project, key), options)?.deserialize()
    }

    pub fn project_create_variable(
        &self,
        project: &str,
        variable: &NewVariable,
        options: RequestOptions<'_>,
    ) -> Result<ProjectVariable, GitlabError> {
        self.http_post(&variables_path(project), Payload::json(variable)?, options)?
            .deserialize()
    }

    pub fn project_update_variable(
        &self,
        project: &str,
        key: &str,
        update: &VariableUpdate,
        options: RequestOptions<'_>,
    ) -> Result<ProjectVariable, GitlabError> {
        self.http_put(&variable_path(project, key), Payload::json(update)?, options)?
            .deserialize()
    }

    pub fn project_remove_variable(
        &self,
        project: &str,
        key: &str,
        options: RequestOptions<'_>,
    ) -> Result<(), GitlabError> {
        self.http_delete(&variable_path(project, key), options)?;
        Ok(())
    }

    /// Update `key` if it exists, create it otherwise. `options` apply to
    /// both the lookup and the write.
    pub fn project_set_variable(
        &self,
        project: &str,
        key: &str,
        value: &str,
        options: RequestOptions<'_>,
    ) -> Result<ProjectVariable, GitlabError> {
        match self.project_variable(project, key, options.without_sink()) {
            Ok(_) => {
                let update = VariableUpdate {
                    value: Some(value.to_string()),
                    ..Default::default()
                };
                self.project_update_variable(project, key, &update, options)
            }
            Err(err) if err.is_not_found() => {
                self.project_create_variable(project, &NewVariable::new(key, value), options)
            }
            Err(err) => Err(err),
        }
    }
}
