pub mod mutation;
pub mod query;

use crate::error::ApiError;
use crate::models::context::ContextPointer;
use crate::resources::{self, ResourceTemplate};
use crate::tools::{self, ToolCall, ToolDefinition, ToolResponse};
use async_graphql::http::GraphiQLSource;
use async_graphql::{EmptySubscription, Schema};
use async_graphql_rocket::{GraphQLQuery, GraphQLRequest, GraphQLResponse};
use mutation::Mutation;
use query::Query;
use rocket::http::Status;
use rocket::response::content::RawHtml;
use rocket::serde::json::Json;
use rocket::{Catcher, Request, Route, State};
use serde_json::{json, Value};

pub type ApiSchema = Schema<Query, Mutation, EmptySubscription>;

pub fn get_context<'ctx>(context: &async_graphql::Context<'ctx>) -> &'ctx ContextPointer {
    context.data_unchecked::<ContextPointer>()
}

pub fn build_schema(context: ContextPointer) -> ApiSchema {
    Schema::build(Query::default(), Mutation::default(), EmptySubscription)
        .data(context)
        .finish()
}

#[rocket::get("/")]
fn graphiql() -> RawHtml<String> {
    RawHtml(GraphiQLSource::build().endpoint("/graphql").finish())
}

#[rocket::get("/graphql?<query..>")]
async fn graphql_query(schema: &State<ApiSchema>, query: GraphQLQuery) -> GraphQLResponse {
    query.execute(schema.inner()).await
}

#[rocket::post("/graphql", data = "<request>", format = "application/json")]
async fn graphql_request(schema: &State<ApiSchema>, request: GraphQLRequest) -> GraphQLResponse {
    request.execute(schema.inner()).await
}

#[rocket::get("/tools")]
fn list_tools() -> Json<Vec<ToolDefinition>> {
    Json(tools::definitions())
}

#[rocket::post("/tools/call", data = "<call>", format = "json")]
async fn call_tool(context: &State<ContextPointer>, call: Json<ToolCall>) -> Result<Json<ToolResponse>, ApiError> {
    let call = call.into_inner();
    tools::call(context.knowledge_client(), &call.name, call.arguments)
        .await
        .map(Json)
}

#[rocket::get("/resources")]
fn list_resources() -> Json<Vec<ResourceTemplate>> {
    Json(resources::templates())
}

#[rocket::get("/resources/read?<uri>")]
async fn read_resource(context: &State<ContextPointer>, uri: &str) -> Result<Json<ToolResponse>, ApiError> {
    resources::read(context.knowledge_client(), uri).await.map(Json)
}

pub fn routes() -> Vec<Route> {
    rocket::routes![
        graphiql,
        graphql_query,
        graphql_request,
        list_tools,
        call_tool,
        list_resources,
        read_resource
    ]
}

/// Requests rejected before reaching a handler still get a structured body.
#[rocket::catch(default)]
fn default_catcher(status: Status, request: &Request) -> (Status, Json<Value>) {
    log::warn!("{} {} rejected with {}", request.method(), request.uri(), status);
    let kind = match status.code {
        400 | 422 => "invalid_arguments",
        404 => "not_found",
        _ => "server",
    };
    let payload = json!({
        "isError": true,
        "error": {
            "kind": kind,
            "message": status.reason_lossy(),
        }
    });
    (status, Json(payload))
}

pub fn catchers() -> Vec<Catcher> {
    rocket::catchers![default_catcher]
}
