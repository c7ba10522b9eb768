use pretty_assertions::assert_eq;
use typegraph_core::{
    analyze, JsonDocument, OperationKey, Primitive, Type, TypeName,
};

fn run(yaml: &str) -> typegraph_core::Analysis {
    let doc = JsonDocument::from_yaml(yaml).unwrap();
    analyze(&doc).unwrap()
}

#[test]
fn test_component_and_list_response_resolution() {
    let analysis = run(
        r#"
openapi: 3.1.0
info:
  title: Test API
  version: 1.0.0
paths:
  /users:
    get:
      parameters:
        - name: limit
          in: query
          schema: { type: integer }
      responses:
        '200':
          description: ok
          content:
            application/json:
              schema:
                type: array
                items:
                  $ref: '#/components/schemas/User'
components:
  schemas:
    User:
      type: object
      required: [id]
      properties:
        id:
          type: integer
          format: int64
        name:
          type: string
"#,
    );

    let user_ptr = "#/components/schemas/User";
    assert!(analysis.graph.is_component(user_ptr));
    let Some(Type::Object(user)) = analysis.graph.get(user_ptr) else {
        panic!("expected User object")
    };
    assert_eq!(user.name, TypeName::new("models", "User"));
    assert_eq!(user.properties["id"].ty, Type::simple(Primitive::Long));
    assert_eq!(user.required, vec!["id"]);

    let key = OperationKey::new("/users", "get");
    let op = &analysis.responses.operations[&key];
    assert_eq!(
        op.by_status["200"].ty,
        Type::List {
            item: Box::new(Type::Reference {
                target: user_ptr.into(),
            }),
        }
    );
    assert!(!op.success_interface);
    assert!(!op.error_interface);
    assert!(analysis.error_roots.is_empty());

    let params = &analysis.parameters.parameters[&key];
    assert_eq!(params.len(), 1);
    assert_eq!(params[0].name, "limit");
    assert_eq!(params[0].ty, Type::simple(Primitive::Int));
}

#[test]
fn test_heterogeneous_statuses_wrap_and_mark_errors() {
    let analysis = run(
        r#"
openapi: 3.1.0
info:
  title: Test API
  version: 1.0.0
paths:
  /items:
    get:
      responses:
        '200':
          description: ok
          content:
            application/json:
              schema:
                type: array
                items: { type: string }
        default:
          description: failure
          content:
            application/json:
              schema:
                $ref: '#/components/schemas/Problem'
components:
  schemas:
    Problem:
      type: object
      properties:
        message: { type: string }
"#,
    );

    let key = OperationKey::new("/items", "get");
    let op = &analysis.responses.operations[&key];

    // The success list has no nominal identity, so it gets a wrapper.
    let Type::Wrapper(ok) = &op.by_status["200"].ty else {
        panic!("expected wrapper, got {:?}", op.by_status["200"].ty)
    };
    assert_eq!(ok.name.simple, "GetItems200Response");
    assert_eq!(
        *ok.wrapped,
        Type::List {
            item: Box::new(Type::simple(Primitive::String)),
        }
    );

    // The error branch is already nominal through its reference.
    assert_eq!(
        op.by_status["default"].ty,
        Type::Reference {
            target: "#/components/schemas/Problem".into(),
        }
    );
    assert!(op.error_interface);
    assert!(!op.success_interface);

    assert_eq!(
        analysis.error_roots.iter().collect::<Vec<_>>(),
        vec![&TypeName::new("models", "Problem")]
    );
    assert!(analysis
        .responses
        .roots
        .contains(&TypeName::new("models", "GetItems200Response")));
    assert!(analysis
        .responses
        .roots
        .contains(&TypeName::new("models", "Problem")));
}

#[test]
fn test_itemless_array_wraps_opaque_json() {
    let analysis = run(
        r#"
openapi: 3.1.0
info:
  title: Test API
  version: 1.0.0
paths:
  /things:
    get:
      responses:
        '200':
          description: ok
          content:
            application/json:
              schema:
                type: array
        '500':
          description: boom
"#,
    );

    let key = OperationKey::new("/things", "get");
    let op = &analysis.responses.operations[&key];
    let Type::Wrapper(ok) = &op.by_status["200"].ty else {
        panic!("expected wrapper, got {:?}", op.by_status["200"].ty)
    };
    assert_eq!(
        *ok.wrapped,
        Type::List {
            item: Box::new(Type::json()),
        }
    );

    // The schemaless 500 wraps opaque JSON and carries error semantics.
    let Type::Wrapper(boom) = &op.by_status["500"].ty else {
        panic!("expected wrapper, got {:?}", op.by_status["500"].ty)
    };
    assert_eq!(boom.name.simple, "GetThings500Response");
    assert_eq!(*boom.wrapped, Type::json());
    assert!(analysis
        .error_roots
        .contains(&TypeName::new("models", "GetThings500Response")));
}

#[test]
fn test_name_collision_is_disambiguated_in_pointer_order() {
    let analysis = run(
        r#"
openapi: 3.1.0
info:
  title: Test API
  version: 1.0.0
paths: {}
components:
  schemas:
    Widget:
      type: object
      properties:
        config:
          type: object
          properties:
            retries: { type: integer }
    WidgetConfig:
      type: object
      properties:
        timeout: { type: integer }
"#,
    );

    // The nested pointer sorts before the component pointer, so it takes
    // index 0 of the collision group.
    let nested_ptr = "#/components/schemas/Widget/properties/config";
    let component_ptr = "#/components/schemas/WidgetConfig";
    assert_eq!(
        analysis.graph.get(nested_ptr).unwrap().name().unwrap().simple,
        "WidgetConfig0"
    );
    assert_eq!(
        analysis
            .graph
            .get(component_ptr)
            .unwrap()
            .name()
            .unwrap()
            .simple,
        "WidgetConfig1"
    );

    // The parent still reaches the renamed child through its pointer.
    let Some(Type::Object(widget)) = analysis.graph.get("#/components/schemas/Widget") else {
        panic!("expected Widget object")
    };
    assert_eq!(
        widget.properties["config"].ty,
        Type::Reference {
            target: nested_ptr.into(),
        }
    );
}

#[test]
fn test_self_referential_component_is_dropped() {
    let analysis = run(
        r#"
openapi: 3.1.0
info:
  title: Test API
  version: 1.0.0
paths: {}
components:
  schemas:
    Node:
      $ref: '#/components/schemas/Node'
    Leaf:
      type: object
      properties:
        value: { type: string }
"#,
    );

    // The degenerate self-reference never enters the graph; the rest of the
    // document still resolves.
    assert!(analysis.graph.get("#/components/schemas/Node").is_none());
    assert!(!analysis.graph.is_component("#/components/schemas/Node"));
    assert!(analysis.graph.get("#/components/schemas/Leaf").is_some());
}

#[test]
fn test_discriminated_one_of_component() {
    let analysis = run(
        r#"
openapi: 3.1.0
info:
  title: Test API
  version: 1.0.0
paths: {}
components:
  schemas:
    User:
      type: object
      properties:
        name: { type: string }
    Admin:
      type: object
      properties:
        level: { type: integer }
    Principal:
      oneOf:
        - $ref: '#/components/schemas/User'
        - $ref: '#/components/schemas/Admin'
      discriminator:
        propertyName: role
        mapping:
          admin: '#/components/schemas/Admin'
"#,
    );

    let Some(Type::OneOf(principal)) = analysis.graph.get("#/components/schemas/Principal")
    else {
        panic!("expected oneOf")
    };
    assert_eq!(principal.discriminator.as_deref(), Some("role"));
    assert_eq!(principal.variants.len(), 2);
    assert_eq!(principal.variants[0].tag, "User");
    assert_eq!(principal.variants[1].tag, "admin");
    assert_eq!(
        principal.variant("admin").unwrap().ty,
        Type::Reference {
            target: "#/components/schemas/Admin".into(),
        }
    );
}

#[test]
fn test_all_of_error_response_and_request_body() {
    let analysis = run(
        r#"
openapi: 3.1.0
info:
  title: Test API
  version: 1.0.0
paths:
  /orders:
    post:
      requestBody:
        required: true
        content:
          application/json:
            schema:
              $ref: '#/components/schemas/NewOrder'
      responses:
        '201':
          description: created
          content:
            application/json:
              schema:
                $ref: '#/components/schemas/Order'
        '400':
          description: invalid
          content:
            application/json:
              schema:
                allOf:
                  - $ref: '#/components/schemas/Problem'
                  - type: object
                    required: [field]
                    properties:
                      field: { type: string }
components:
  schemas:
    NewOrder:
      type: object
      properties:
        sku: { type: string }
    Order:
      type: object
      properties:
        id: { type: integer }
    Problem:
      type: object
      required: [message]
      properties:
        message: { type: string }
"#,
    );

    let key = OperationKey::new("/orders", "post");
    let op = &analysis.responses.operations[&key];
    assert_eq!(
        op.by_status["201"].ty,
        Type::Reference {
            target: "#/components/schemas/Order".into(),
        }
    );

    let Type::Object(invalid) = &op.by_status["400"].ty else {
        panic!("expected merged object, got {:?}", op.by_status["400"].ty)
    };
    assert_eq!(invalid.name.simple, "PostOrders400Response");
    assert_eq!(
        invalid.properties.keys().collect::<Vec<_>>(),
        vec!["message", "field"]
    );
    assert_eq!(invalid.required, vec!["message", "field"]);
    assert!(analysis
        .error_roots
        .contains(&TypeName::new("models", "PostOrders400Response")));

    let body = &analysis.parameters.request_bodies[&key];
    assert!(body.required);
    assert_eq!(
        body.ty,
        Type::Reference {
            target: "#/components/schemas/NewOrder".into(),
        }
    );
}

#[test]
fn test_shared_component_response_across_operations() {
    let analysis = run(
        r#"
openapi: 3.1.0
info:
  title: Test API
  version: 1.0.0
paths:
  /a:
    get:
      responses:
        '200':
          description: ok
          content:
            application/json:
              schema: { type: object, properties: { ok: { type: boolean } } }
        '500':
          $ref: '#/components/responses/ServerError'
  /b:
    delete:
      responses:
        '204':
          description: gone
        '500':
          $ref: '#/components/responses/ServerError'
components:
  responses:
    ServerError:
      description: failure
      content:
        application/json:
          schema:
            type: object
            required: [message]
            properties:
              message: { type: string }
"#,
    );

    let schema_ptr = "#/components/responses/ServerError/content/application~1json/schema";
    let expected = Type::Reference {
        target: schema_ptr.into(),
    };

    let a = &analysis.responses.operations[&OperationKey::new("/a", "get")];
    let b = &analysis.responses.operations[&OperationKey::new("/b", "delete")];
    assert_eq!(a.by_status["500"].ty, expected);
    assert_eq!(b.by_status["500"].ty, expected);

    // One shared payload type, marked once, named after the component.
    assert_eq!(
        analysis.graph.get(schema_ptr).unwrap().name().unwrap().simple,
        "ServerError"
    );
    assert_eq!(
        analysis.error_roots.iter().collect::<Vec<_>>(),
        vec![&TypeName::new("models", "ServerError")]
    );
}

#[test]
fn test_null_paired_type_arrays_resolve_as_nullable() {
    let analysis = run(
        r#"
openapi: 3.1.0
info:
  title: Test API
  version: 1.0.0
paths: {}
components:
  schemas:
    Name:
      type: [string, "null"]
    Account:
      type: object
      properties:
        nickname:
          type: [string, "null"]
"#,
    );

    assert_eq!(
        analysis.graph.get("#/components/schemas/Name"),
        Some(&Type::Simple {
            primitive: Primitive::String,
            nullable: true,
        })
    );
    let Some(Type::Object(account)) = analysis.graph.get("#/components/schemas/Account") else {
        panic!("expected Account object")
    };
    assert_eq!(
        account.properties["nickname"].ty,
        Type::Simple {
            primitive: Primitive::String,
            nullable: true,
        }
    );
}

#[test]
fn test_analysis_is_deterministic_across_runs() {
    let yaml = r#"
openapi: 3.1.0
info:
  title: Test API
  version: 1.0.0
paths:
  /users:
    get:
      responses:
        '200':
          description: ok
          content:
            application/json:
              schema:
                type: array
                items:
                  $ref: '#/components/schemas/User'
        '404':
          description: missing
components:
  schemas:
    User:
      type: object
      properties:
        id: { type: integer }
        tags:
          type: array
          items: { type: string }
"#;

    let first = run(yaml);
    let second = run(yaml);

    // Insertion order varies across parallel runs; content must not.
    let ptrs = |a: &typegraph_core::Analysis| {
        let mut keys: Vec<_> = a.graph.types.keys().cloned().collect();
        keys.sort_unstable();
        keys
    };
    assert_eq!(ptrs(&first), ptrs(&second));
    for (ptr, ty) in &first.graph.types {
        assert_eq!(second.graph.get(ptr), Some(ty));
    }
    assert_eq!(first.error_roots, second.error_roots);
}
