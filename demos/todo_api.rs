//! A todo API built from controllers.
//!
//! Run with `RUST_LOG=debug cargo run --example todo_api` and try:
//!
//! ```text
//! curl -X POST localhost:8080/todos -H 'Content-Type: application/json' -d '{"title":"write docs"}'
//! curl localhost:8080/todos
//! curl localhost:8080/todos/1/notes?limit=5
//! curl -X DELETE localhost:8080/todos/1 -H 'X-Api-Key: demo'
//! ```

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use log::info;
use microhttp_controllers::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
struct Todo {
    id: u64,
    title: String,
    done: bool,
}

#[derive(Debug, Deserialize)]
struct TodoInput {
    title: Option<String>,
    done: Option<bool>,
}

/// In-memory storage shared through the container.
#[derive(Default)]
struct TodoRepository {
    todos: Mutex<BTreeMap<u64, Todo>>,
}

impl Injectable for TodoRepository {
    fn construct(_: &Container) -> Result<Self, ContainerError> {
        Ok(TodoRepository::default())
    }
}

impl TodoRepository {
    fn with<R>(&self, f: impl FnOnce(&mut BTreeMap<u64, Todo>) -> R) -> R {
        let mut todos = self.todos.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut todos)
    }
}

struct TodoController {
    repository: Arc<TodoRepository>,
}

impl Injectable for TodoController {
    fn construct(container: &Container) -> Result<Self, ContainerError> {
        Ok(TodoController {
            repository: container.resolve()?,
        })
    }
}

fn not_found(id: u64) -> Error {
    HttpError::not_found().with_message(format!("Todo {id} not found")).into()
}

impl TodoController {
    async fn index(self: Arc<Self>, _args: Args) -> Result<Reply, Error> {
        let todos: Vec<Todo> = self.repository.with(|todos| todos.values().cloned().collect());
        Reply::json(&todos)
    }

    async fn show(self: Arc<Self>, args: Args) -> Result<Reply, Error> {
        let id: u64 = args.parse(0)?;
        let todo = self.repository.with(|todos| todos.get(&id).cloned());
        Reply::json(&todo.ok_or_else(|| not_found(id))?)
    }

    async fn create(self: Arc<Self>, args: Args) -> Result<Reply, Error> {
        let input: TodoInput = args.json(0)?;
        let title = input
            .title
            .filter(|title| !title.trim().is_empty())
            .ok_or_else(|| HttpError::bad_request().with_message("title is required"))?;

        let todo = self.repository.with(|todos| {
            let id = todos.keys().next_back().map_or(1, |last| last + 1);
            let todo = Todo {
                id,
                title,
                done: input.done.unwrap_or(false),
            };
            todos.insert(id, todo.clone());
            todo
        });

        let response = args.response(1)?;
        response.set_status(StatusCode::CREATED);
        response.set_header("Location", format!("/todos/{}", todo.id));
        Reply::json(&todo)
    }

    async fn patch(self: Arc<Self>, args: Args) -> Result<Reply, Error> {
        let id: u64 = args.parse(0)?;
        let input: TodoInput = args.json(1)?;
        let updated = self.repository.with(|todos| {
            let todo = todos.get_mut(&id)?;
            if let Some(title) = input.title {
                todo.title = title;
            }
            if let Some(done) = input.done {
                todo.done = done;
            }
            Some(todo.clone())
        });
        Reply::json(&updated.ok_or_else(|| not_found(id))?)
    }

    async fn delete(self: Arc<Self>, args: Args) -> Result<Reply, Error> {
        let id: u64 = args.parse(0)?;
        match self.repository.with(|todos| todos.remove(&id)) {
            Some(_) => Ok(Reply::Empty),
            None => Err(not_found(id)),
        }
    }
}

impl Controller for TodoController {
    fn declare(def: &mut ControllerDef<Self>) -> Result<(), DecoratorError> {
        def.resource("todos")?;
        def.middleware(|ctx: RequestContext, next: Next| {
            info!("{} {}", ctx.request.method, ctx.request.path);
            next.run(ctx)
        });

        def.action(ResourceAction::Index, TodoController::index);
        def.action(ResourceAction::Show, TodoController::show).path(0, "id");
        def.action(ResourceAction::Create, TodoController::create)
            .body(0, None)
            .response(1);
        def.action(ResourceAction::Patch, TodoController::patch)
            .path(0, "id")
            .body(1, None);
        def.action(ResourceAction::Delete, TodoController::delete)
            .path(0, "id")
            .middleware(|ctx: RequestContext, next: Next| {
                let authorized = ctx
                    .request
                    .get_header("X-Api-Key")
                    .is_some_and(|key| key == "demo");
                async move {
                    if authorized {
                        next.run(ctx).await
                    } else {
                        Err(HttpError::unauthorized().with_message("X-Api-Key required").into())
                    }
                }
            });

        def.nested::<NoteController>();
        Ok(())
    }
}

/// Notes below a todo, to show nesting and query bindings.
struct NoteController;

impl Injectable for NoteController {
    fn construct(_: &Container) -> Result<Self, ContainerError> {
        Ok(NoteController)
    }
}

impl NoteController {
    async fn list(self: Arc<Self>, args: Args) -> Result<Reply, Error> {
        let todo: u64 = args.parse(0)?;
        let limit: usize = args.parse_opt(1)?.unwrap_or(10);
        let trace = args.text(2)?.as_deref().unwrap_or("-").to_string();
        let notes: Vec<String> = (1..=limit.min(3)).map(|n| format!("note {n} of todo {todo}")).collect();
        Reply::json(&serde_json::json!({ "todo": todo, "notes": notes, "trace": trace }))
    }
}

impl Controller for NoteController {
    fn declare(def: &mut ControllerDef<Self>) -> Result<(), DecoratorError> {
        def.prefix("/:todoId/notes");
        def.get("/", "list", NoteController::list)
            .path(0, "todoId")
            .query(1, Some("limit"))
            .header(2, "X-Trace-Id");
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let app = App::builder()
        .config(AppConfig::from_env())
        .controller::<TodoController>()
        .build()
        .await?;

    for route in app.routes() {
        info!("{route}");
    }

    app.listen().await?;
    Ok(())
}
