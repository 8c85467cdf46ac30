//! The built-in Jira tool table.
//!
//! Grouped by area; [`builtin_descriptors`] concatenates the groups in a stable order.

use crate::descriptor::{
    NameLookup, ParamKind, ParamSpec, ResponseFilter, ResponseShape, RouteCondition,
    ToolDescriptor,
};
use reqwest::Method;

const SEARCH_PATH: &str = "/rest/api/2/search";
const CLOUD_SEARCH_PATH: &str = "/rest/api/3/search/jql";
const DEFAULT_SEARCH_FIELDS: &str = "summary,status,priority,issuetype,assignee,reporter,created,updated,description,labels,components,project,resolution,resolutiondate";
const EPIC_LINK_FIELD: &str = "/fields/customfield_10014";

#[must_use]
pub fn builtin_descriptors() -> Vec<ToolDescriptor> {
    [
        issue_tools(),
        comment_tools(),
        transition_tools(),
        project_tools(),
        board_tools(),
        sprint_tools(),
        epic_tools(),
        link_tools(),
        worklog_tools(),
        version_tools(),
        attachment_tools(),
        user_tools(),
        field_tools(),
    ]
    .into_iter()
    .flatten()
    .collect()
}

fn issue_key() -> ParamSpec {
    ParamSpec::path("issue_key", "Issue key, e.g. PROJ-123.")
}

/// Cloud identifies users by account id, Server/Data Center by user name.
fn assignee() -> ParamSpec {
    ParamSpec::body_by_deployment(
        "assignee",
        "/fields/assignee/id",
        "/fields/assignee/name",
        "Assignee: account ID on Cloud, user name on Server/Data Center.",
    )
}

fn max_results() -> ParamSpec {
    ParamSpec::query("max_results", "maxResults", "Maximum number of results (1-100).")
        .kind(ParamKind::bounded(1, 100))
        .default("50")
}

fn search_fields() -> ParamSpec {
    ParamSpec::query("fields", "fields", "Fields to return.")
        .kind(ParamKind::StringList)
        .default(DEFAULT_SEARCH_FIELDS)
}

/// A JQL search tool; uses the enhanced search endpoint on Cloud.
fn search_tool(name: &'static str, description: &'static str) -> ToolDescriptor {
    ToolDescriptor::read(name, Method::GET, SEARCH_PATH, description)
        .route(RouteCondition::Cloud, CLOUD_SEARCH_PATH)
}

fn issue_tools() -> Vec<ToolDescriptor> {
    vec![
        ToolDescriptor::read(
            "jira_get_issue",
            Method::GET,
            "/rest/api/2/issue/{issue_key}",
            "Get a Jira issue by key.",
        )
        .params(vec![
            issue_key(),
            ParamSpec::query("fields", "fields", "Fields to return.").kind(ParamKind::StringList),
            ParamSpec::query("expand", "expand", "Entities to expand, e.g. changelog.")
                .kind(ParamKind::StringList),
        ]),
        ToolDescriptor::write(
            "jira_create_issue",
            Method::POST,
            "/rest/api/2/issue",
            "Create a new Jira issue.",
        )
        .params(vec![
            ParamSpec::body("project_key", "/fields/project/key", "Project key.").required(),
            ParamSpec::body("summary", "/fields/summary", "Issue summary.").required(),
            ParamSpec::body("issue_type", "/fields/issuetype/name", "Issue type, e.g. Task.")
                .required(),
            ParamSpec::body("description", "/fields/description", "Issue description."),
            assignee(),
            ParamSpec::body("priority", "/fields/priority/name", "Priority name."),
            ParamSpec::body("labels", "/fields/labels", "Labels.").kind(ParamKind::StringList),
        ]),
        ToolDescriptor::write(
            "jira_update_issue",
            Method::PUT,
            "/rest/api/2/issue/{issue_key}",
            "Update fields of an existing issue.",
        )
        .params(vec![
            issue_key(),
            ParamSpec::body("summary", "/fields/summary", "New summary."),
            ParamSpec::body("description", "/fields/description", "New description."),
            assignee(),
            ParamSpec::body("priority", "/fields/priority/name", "Priority name."),
            ParamSpec::body("labels", "/fields/labels", "Replacement labels.")
                .kind(ParamKind::StringList),
        ]),
        ToolDescriptor::write(
            "jira_delete_issue",
            Method::DELETE,
            "/rest/api/2/issue/{issue_key}",
            "Delete an issue.",
        )
        .params(vec![issue_key()]),
        search_tool("jira_search", "Search issues with JQL.").params(vec![
            ParamSpec::jql("jql", "{}", "JQL query.").required(),
            max_results(),
            ParamSpec::query("start_at", "startAt", "Index of the first result.")
                .kind(ParamKind::Integer {
                    min: Some(0),
                    max: None,
                })
                .default("0"),
            search_fields(),
        ]),
        ToolDescriptor::write(
            "jira_batch_create_issues",
            Method::POST,
            "/rest/api/2/issue/bulk",
            "Create several issues in one request. Each entry is an issue update ({\"fields\": {...}}).",
        )
        .params(vec![
            ParamSpec::body("issues", "/issueUpdates", "Issue updates to create.")
                .kind(ParamKind::ObjectList)
                .required(),
        ]),
        ToolDescriptor::read(
            "jira_batch_get_changelogs",
            Method::GET,
            "/rest/api/2/issue/{issue_keys}",
            "Get the changelog of several issues.",
        )
        .params(vec![
            ParamSpec::path("issue_keys", "Issue keys.").kind(ParamKind::StringList),
        ])
        .fixed_query("expand", "changelog")
        .fixed_query("fields", "summary")
        .fan_out("issue_keys"),
    ]
}

fn comment_tools() -> Vec<ToolDescriptor> {
    vec![
        ToolDescriptor::write(
            "jira_add_comment",
            Method::POST,
            "/rest/api/2/issue/{issue_key}/comment",
            "Add a comment to an issue.",
        )
        .params(vec![
            issue_key(),
            ParamSpec::body("comment", "/body", "Comment text.").required(),
        ]),
        ToolDescriptor::read(
            "jira_get_comments",
            Method::GET,
            "/rest/api/2/issue/{issue_key}/comment",
            "List comments on an issue.",
        )
        .params(vec![issue_key()]),
    ]
}

fn transition_tools() -> Vec<ToolDescriptor> {
    vec![
        ToolDescriptor::read(
            "jira_get_transitions",
            Method::GET,
            "/rest/api/2/issue/{issue_key}/transitions",
            "List workflow transitions available for an issue.",
        )
        .params(vec![issue_key()]),
        ToolDescriptor::write(
            "jira_transition_issue",
            Method::POST,
            "/rest/api/2/issue/{issue_key}/transitions",
            "Move an issue through its workflow.",
        )
        .params(vec![
            issue_key(),
            ParamSpec::body("transition_id", "/transition/id", "Transition ID."),
            ParamSpec::local(
                "transition_name",
                "Transition name, e.g. \"Start Progress\". Used when transition_id is absent.",
            ),
            ParamSpec::body("resolution", "/fields/resolution/name", "Resolution name."),
            ParamSpec::body(
                "comment",
                "/update/comment/0/add/body",
                "Comment added with the transition.",
            ),
        ])
        .lookup(NameLookup {
            param: "transition_name",
            target: "transition_id",
            path: "/rest/api/2/issue/{issue_key}/transitions",
            within: "transitions",
            noun: "transition",
        }),
    ]
}

fn project_tools() -> Vec<ToolDescriptor> {
    vec![
        ToolDescriptor::read(
            "jira_get_all_projects",
            Method::GET,
            "/rest/api/2/project",
            "List all visible projects.",
        )
        .returns_list(None),
        search_tool("jira_get_project_issues", "List issues of a project.").params(vec![
            ParamSpec::jql("project_key", "project = {}", "Project key.").required(),
            ParamSpec::jql("jql", "({})", "Additional JQL filter."),
            max_results(),
            search_fields(),
        ]),
    ]
}

fn board_tools() -> Vec<ToolDescriptor> {
    vec![
        ToolDescriptor::read(
            "jira_get_agile_boards",
            Method::GET,
            "/rest/agile/1.0/board",
            "List agile boards.",
        )
        .params(vec![
            ParamSpec::query("project_key", "projectKeyOrId", "Only boards of this project."),
            ParamSpec::query("board_type", "type", "Board type.")
                .kind(ParamKind::OneOf(&["scrum", "kanban", "simple"])),
        ])
        .returns_list(Some("values")),
        ToolDescriptor::read(
            "jira_get_board_issues",
            Method::GET,
            "/rest/agile/1.0/board/{board_id}/issue",
            "List issues on a board.",
        )
        .params(vec![
            ParamSpec::path("board_id", "Board ID.").kind(ParamKind::Integer {
                min: None,
                max: None,
            }),
            ParamSpec::jql("jql", "{}", "Additional JQL filter."),
            max_results(),
        ]),
    ]
}

fn sprint_tools() -> Vec<ToolDescriptor> {
    let any_int = ParamKind::Integer {
        min: None,
        max: None,
    };
    vec![
        ToolDescriptor::read(
            "jira_get_sprints_from_board",
            Method::GET,
            "/rest/agile/1.0/board/{board_id}/sprint",
            "List sprints of a board.",
        )
        .params(vec![
            ParamSpec::path("board_id", "Board ID.").kind(any_int.clone()),
            ParamSpec::query("state", "state", "Sprint state.")
                .kind(ParamKind::OneOf(&["active", "future", "closed"])),
        ])
        .returns_list(Some("values")),
        ToolDescriptor::read(
            "jira_get_sprint_issues",
            Method::GET,
            "/rest/agile/1.0/sprint/{sprint_id}/issue",
            "List issues in a sprint.",
        )
        .params(vec![
            ParamSpec::path("sprint_id", "Sprint ID.").kind(any_int.clone()),
            ParamSpec::jql("jql", "{}", "Additional JQL filter."),
            max_results(),
        ]),
        ToolDescriptor::write(
            "jira_create_sprint",
            Method::POST,
            "/rest/agile/1.0/sprint",
            "Create a sprint on a board.",
        )
        .params(vec![
            ParamSpec::body("name", "/name", "Sprint name.").required(),
            ParamSpec::body("board_id", "/originBoardId", "Board ID.")
                .kind(any_int.clone())
                .required(),
            ParamSpec::body("start_date", "/startDate", "Start date (ISO 8601)."),
            ParamSpec::body("end_date", "/endDate", "End date (ISO 8601)."),
            ParamSpec::body("goal", "/goal", "Sprint goal."),
        ]),
        ToolDescriptor::write(
            "jira_update_sprint",
            Method::POST,
            "/rest/agile/1.0/sprint/{sprint_id}",
            "Update a sprint. Only supplied fields change.",
        )
        .params(vec![
            ParamSpec::path("sprint_id", "Sprint ID.").kind(any_int),
            ParamSpec::body("name", "/name", "Sprint name."),
            ParamSpec::body("state", "/state", "New state.")
                .kind(ParamKind::OneOf(&["active", "closed"])),
            ParamSpec::body("start_date", "/startDate", "Start date (ISO 8601)."),
            ParamSpec::body("end_date", "/endDate", "End date (ISO 8601)."),
            ParamSpec::body("goal", "/goal", "Sprint goal."),
        ]),
    ]
}

fn epic_tools() -> Vec<ToolDescriptor> {
    vec![
        ToolDescriptor::write(
            "jira_link_to_epic",
            Method::PUT,
            "/rest/api/2/issue/{issue_key}",
            "Link an issue to an epic.",
        )
        .params(vec![
            issue_key(),
            ParamSpec::body("epic_key", EPIC_LINK_FIELD, "Epic issue key.").required(),
        ]),
        search_tool("jira_get_epic_issues", "List issues linked to an epic.").params(vec![
            ParamSpec::jql("epic_key", "\"Epic Link\" = {}", "Epic issue key.").required(),
            max_results(),
            search_fields(),
        ]),
    ]
}

fn link_tools() -> Vec<ToolDescriptor> {
    vec![
        ToolDescriptor::read(
            "jira_get_link_types",
            Method::GET,
            "/rest/api/2/issueLinkType",
            "List issue link types.",
        )
        .returns_list(Some("issueLinkTypes")),
        ToolDescriptor::write(
            "jira_create_issue_link",
            Method::POST,
            "/rest/api/2/issueLink",
            "Link two issues.",
        )
        .params(vec![
            ParamSpec::body("link_type", "/type/name", "Link type name, e.g. Blocks.").required(),
            ParamSpec::body("inward_issue", "/inwardIssue/key", "Inward issue key.").required(),
            ParamSpec::body("outward_issue", "/outwardIssue/key", "Outward issue key.")
                .required(),
            ParamSpec::body("comment", "/comment/body", "Comment added with the link."),
        ]),
        ToolDescriptor::write(
            "jira_remove_issue_link",
            Method::DELETE,
            "/rest/api/2/issueLink/{link_id}",
            "Remove an issue link.",
        )
        .params(vec![ParamSpec::path("link_id", "Link ID.")]),
        ToolDescriptor::write(
            "jira_create_remote_issue_link",
            Method::POST,
            "/rest/api/2/issue/{issue_key}/remotelink",
            "Attach a web link to an issue.",
        )
        .params(vec![
            issue_key(),
            ParamSpec::body("url", "/object/url", "Target URL.").required(),
            ParamSpec::body("title", "/object/title", "Link title.").required(),
            ParamSpec::body("summary", "/object/summary", "Link summary."),
        ]),
    ]
}

fn worklog_tools() -> Vec<ToolDescriptor> {
    vec![
        ToolDescriptor::write(
            "jira_add_worklog",
            Method::POST,
            "/rest/api/2/issue/{issue_key}/worklog",
            "Log time on an issue.",
        )
        .params(vec![
            issue_key(),
            ParamSpec::body("time_spent", "/timeSpent", "Time spent, e.g. 3h 30m.").required(),
            ParamSpec::body("comment", "/comment", "Work description."),
            ParamSpec::body("started", "/started", "Start time (Jira datetime format)."),
        ]),
        ToolDescriptor::read(
            "jira_get_worklog",
            Method::GET,
            "/rest/api/2/issue/{issue_key}/worklog",
            "List worklogs of an issue.",
        )
        .params(vec![issue_key()]),
    ]
}

fn version_tools() -> Vec<ToolDescriptor> {
    vec![
        ToolDescriptor::read(
            "jira_get_project_versions",
            Method::GET,
            "/rest/api/2/project/{project_key}/versions",
            "List versions of a project.",
        )
        .params(vec![ParamSpec::path("project_key", "Project key.")])
        .returns_list(None),
        ToolDescriptor::write(
            "jira_create_version",
            Method::POST,
            "/rest/api/2/version",
            "Create a project version.",
        )
        .params(vec![
            ParamSpec::body("project_key", "/project", "Project key.").required(),
            ParamSpec::body("name", "/name", "Version name.").required(),
            ParamSpec::body("description", "/description", "Version description."),
            ParamSpec::body("release_date", "/releaseDate", "Release date (YYYY-MM-DD)."),
            ParamSpec::body("start_date", "/startDate", "Start date (YYYY-MM-DD)."),
            ParamSpec::body("released", "/released", "Mark as released.")
                .kind(ParamKind::Boolean),
            ParamSpec::body("archived", "/archived", "Mark as archived.")
                .kind(ParamKind::Boolean),
        ]),
        ToolDescriptor::write(
            "jira_batch_create_versions",
            Method::POST,
            "/rest/api/2/version",
            "Create several versions in a project.",
        )
        .params(vec![
            ParamSpec::body("project_key", "/project", "Project key.").required(),
            ParamSpec::body("version_names", "/name", "Version names.")
                .kind(ParamKind::StringList)
                .required(),
        ])
        .fan_out("version_names"),
    ]
}

fn attachment_tools() -> Vec<ToolDescriptor> {
    vec![
        ToolDescriptor::read(
            "jira_download_attachments",
            Method::GET,
            "/rest/api/2/attachment/content/{attachment_id}",
            "Download attachment content.",
        )
        .params(vec![ParamSpec::path("attachment_id", "Attachment ID.")])
        .returns(ResponseShape::Binary),
        ToolDescriptor::write(
            "jira_add_attachment",
            Method::POST,
            "/rest/api/2/issue/{issue_key}/attachments",
            "Upload a local file as an issue attachment.",
        )
        .params(vec![
            issue_key(),
            ParamSpec::file("file_path", "Path of the local file to upload."),
            ParamSpec::file_name("filename", "Name to store the file under."),
        ])
        .header("X-Atlassian-Token", "no-check")
        .returns_list(None),
    ]
}

fn user_tools() -> Vec<ToolDescriptor> {
    vec![
        ToolDescriptor::read(
            "jira_get_user_profile",
            Method::GET,
            "/rest/api/2/user",
            "Get a user profile. Without account_id, returns the current user.",
        )
        .params(vec![ParamSpec::query("account_id", "accountId", "User account ID.")])
        .route(RouteCondition::Absent("account_id"), "/rest/api/2/myself"),
        ToolDescriptor::read(
            "jira_search_users",
            Method::GET,
            "/rest/api/2/user/search",
            "Search users by name or email.",
        )
        .params(vec![
            ParamSpec::query("query", "query", "Search text.").required(),
            max_results(),
        ])
        .returns_list(None),
    ]
}

fn field_tools() -> Vec<ToolDescriptor> {
    vec![
        ToolDescriptor::read(
            "jira_search_fields",
            Method::GET,
            "/rest/api/2/field",
            "List fields, optionally filtered by name or ID.",
        )
        .params(vec![ParamSpec::local("query", "Case-insensitive name or ID filter.")])
        .returns_list(None)
        .filter(ResponseFilter::NameContains("query")),
    ]
}
