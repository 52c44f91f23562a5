#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::path::Path;

use apiweave_common::{ServiceSource, SpecSource};
use apiweave_core::migration::RenameReason;
use apiweave_core::rewrite::rewrite_tree;
use apiweave_core::{MergeError, Pipeline, PipelineConfig, RelocationMap, Result, fsutil};
use serde_json::{Value, json};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const HEADER: &str = "/* generated using openapi-typescript-codegen -- do not edit */\n/* istanbul ignore file */\n/* tslint:disable */\n/* eslint-disable */\n";

fn identity_doc() -> Value {
    json!({
        "openapi": "3.0.1",
        "info": { "title": "Identity" },
        "paths": {},
        "components": {
            "schemas": {
                "CompanyRoleAssignmentDto": {
                    "type": "object",
                    "properties": {
                        "link": { "$ref": "#/components/schemas/Link" },
                        "role": { "type": "string", "enum": ["ADMIN", "EMPLOYEE"] }
                    }
                },
                "Link": { "type": "object", "properties": { "href": { "type": "string" } } },
                "UserDto": {
                    "type": "object",
                    "properties": {
                        "id": { "type": "string" },
                        "roles": { "type": "array", "items": { "type": "string", "enum": ["USER", "ADMIN"] } }
                    }
                }
            }
        }
    })
}

fn booking_doc() -> Value {
    json!({
        "openapi": "3.0.1",
        "info": { "title": "Booking" },
        "paths": {},
        "components": {
            "schemas": {
                "BookingDto": {
                    "type": "object",
                    "properties": { "status": { "type": "string", "enum": ["PENDING", "CONFIRMED"] } }
                },
                "UserDto": {
                    "type": "object",
                    "properties": {
                        "id": { "type": "integer" },
                        "state": { "type": "string", "enum": ["CONFIRMED", "PENDING"] }
                    }
                }
            }
        }
    })
}

fn write(out: &Path, rel: &str, contents: &str) -> Result<()> {
    fsutil::write(&out.join(rel), &format!("{HEADER}{contents}"))
}

fn write_core(out: &Path) -> Result<()> {
    write(out, "core/ApiRequestOptions.ts", "export type ApiRequestOptions = {\n    readonly method: 'GET' | 'POST' | 'DELETE';\n    readonly url: string;\n};\n")?;
    write(out, "core/ApiResult.ts", "export type ApiResult = {\n    readonly ok: boolean;\n    readonly status: number;\n    readonly body: any;\n};\n")?;
    write(
        out,
        "core/ApiError.ts",
        "import type { ApiRequestOptions } from './ApiRequestOptions';\nimport type { ApiResult } from './ApiResult';\n\nexport class ApiError extends Error {\n    public readonly status: number;\n\n    constructor(request: ApiRequestOptions, response: ApiResult, message: string) {\n        super(message);\n        this.name = 'ApiError';\n        this.status = response.status;\n    }\n}\n",
    )?;
    write(
        out,
        "core/CancelablePromise.ts",
        "export class CancelError extends Error {\n    constructor(message: string) {\n        super(message);\n        this.name = 'CancelError';\n    }\n}\n\nexport interface OnCancel {\n    (cancelHandler: () => void): void;\n}\n\nexport class CancelablePromise<T> implements Promise<T> {\n    readonly [Symbol.toStringTag] = 'CancelablePromise';\n}\n",
    )?;
    write(
        out,
        "core/OpenAPI.ts",
        "import type { ApiRequestOptions } from './ApiRequestOptions';\n\ntype Resolver<T> = (options: ApiRequestOptions) => Promise<T>;\ntype Headers = Record<string, string>;\n\nexport type OpenAPIConfig = {\n    BASE: string;\n    TOKEN?: string | Resolver<string> | undefined;\n    HEADERS?: Headers | Resolver<Headers> | undefined;\n};\n\nexport const OpenAPI: OpenAPIConfig = {\n    BASE: 'http://localhost:8080',\n    TOKEN: undefined,\n    HEADERS: undefined,\n};\n",
    )?;
    write(
        out,
        "core/request.ts",
        "import axios from 'axios';\nimport { ApiError } from './ApiError';\nimport type { ApiRequestOptions } from './ApiRequestOptions';\nimport type { ApiResult } from './ApiResult';\nimport { CancelablePromise } from './CancelablePromise';\nimport type { OpenAPIConfig } from './OpenAPI';\n\nexport const catchErrorCodes = (options: ApiRequestOptions, result: ApiResult): void => {\n    if (!result.ok) {\n        throw new ApiError(options, result, 'Generic Error');\n    }\n};\n\nexport const request = <T>(config: OpenAPIConfig, options: ApiRequestOptions): CancelablePromise<T> => {\n    return new CancelablePromise<T>();\n};\n",
    )
}

fn write_envelope_support(out: &Path) -> Result<()> {
    write(out, "models/ApiErrorDetail.ts", "export type ApiErrorDetail = {\n    field?: string;\n    message?: string;\n};\n")?;
    write(out, "models/ApiMeta.ts", "export type ApiMeta = {\n    page?: number;\n    size?: number;\n};\n")?;
    write(
        out,
        "models/ApiResponseBoolean.ts",
        "import type { ApiErrorDetail } from './ApiErrorDetail';\nimport type { ApiMeta } from './ApiMeta';\n\nexport type ApiResponseBoolean = {\n    success?: boolean;\n    message?: string;\n    data?: boolean;\n    errors?: Array<ApiErrorDetail>;\n    meta?: ApiMeta;\n    timestamp?: string;\n};\n\n",
    )
}

fn write_identity(out: &Path) -> Result<()> {
    write(out, "models/Link.ts", "export type Link = {\n    href?: string;\n};\n\n")?;
    write(out, "schemas/$Link.ts", "export const $Link = {\n    properties: {\n        href: {\n            type: 'string',\n        },\n    },\n} as const;\n")?;
    write(
        out,
        "models/UserDto.ts",
        "export type UserDto = {\n    id?: string;\n    roles?: Array<'USER' | 'ADMIN'>;\n};\n\n",
    )?;
    write(out, "schemas/$UserDto.ts", "export const $UserDto = {\n    properties: {\n        id: {\n            type: 'string',\n        },\n    },\n} as const;\n")?;
    write(
        out,
        "models/CompanyRoleAssignmentDto.ts",
        "import type { Link } from './Link';\n\nexport type CompanyRoleAssignmentDto = {\n    link?: Link;\n    role?: CompanyRoleAssignmentDto.role;\n};\n\nexport namespace CompanyRoleAssignmentDto {\n\n    export enum role {\n        ADMIN = 'ADMIN',\n        EMPLOYEE = 'EMPLOYEE',\n    }\n\n}\n\n",
    )?;
    write(
        out,
        "services/UsersService.ts",
        "import type { UserDto } from '../models/UserDto';\nimport type { CancelablePromise } from '../core/CancelablePromise';\nimport { OpenAPI } from '../core/OpenAPI';\nimport { request as __request } from '../core/request';\nexport class UsersService {\n    /**\n     * @param id\n     * @returns UserDto OK\n     * @throws ApiError\n     */\n    public static getUser(\n        id: string,\n    ): CancelablePromise<UserDto> {\n        return __request(OpenAPI, {\n            method: 'GET',\n            url: '/users/{id}',\n            path: {\n                'id': id,\n            },\n        });\n    }\n    /**\n     * @param role\n     * @returns UserDto OK\n     * @throws ApiError\n     */\n    public static listByRole(\n        role: 'ADMIN' | 'EMPLOYEE',\n    ): CancelablePromise<Array<UserDto>> {\n        return __request(OpenAPI, {\n            method: 'GET',\n            url: '/users',\n            query: {\n                'role': role,\n            },\n        });\n    }\n}\n",
    )?;
    write(
        out,
        "index.ts",
        "export { ApiError } from './core/ApiError';\nexport { OpenAPI } from './core/OpenAPI';\nexport type { UserDto } from './models/UserDto';\nexport { UsersService } from './services/UsersService';\n",
    )
}

fn write_booking(out: &Path) -> Result<()> {
    write(out, "models/Link.ts", "export type Link = {\n    href?: string;\n};\n\n")?;
    write(out, "schemas/$Link.ts", "export const $Link = {\n    properties: {\n        href: {\n            type: 'string',\n        },\n    },\n} as const;\n")?;
    write(
        out,
        "models/UserDto.ts",
        "export type UserDto = {\n    id?: number;\n    state?: 'PENDING' | 'CONFIRMED';\n};\n\n",
    )?;
    write(out, "schemas/$UserDto.ts", "export const $UserDto = {\n    properties: {\n        id: {\n            type: 'number',\n        },\n    },\n} as const;\n")?;
    write(
        out,
        "models/ApiResponseUserDto.ts",
        "import type { ApiErrorDetail } from './ApiErrorDetail';\nimport type { ApiMeta } from './ApiMeta';\nimport type { UserDto } from './UserDto';\n\nexport type ApiResponseUserDto = {\n    success?: boolean;\n    message?: string;\n    data?: UserDto;\n    errors?: Array<ApiErrorDetail>;\n    meta?: ApiMeta;\n    timestamp?: string;\n};\n\n",
    )?;
    write(
        out,
        "services/BookingsService.ts",
        "import type { ApiResponseBoolean } from '../models/ApiResponseBoolean';\nimport type { Link } from '../models/Link';\nimport type { UserDto } from '../models/UserDto';\nimport type { CancelablePromise } from '../core/CancelablePromise';\nimport { OpenAPI } from '../core/OpenAPI';\nimport { request as __request } from '../core/request';\nexport class BookingsService {\n    public static cancel(id: string): CancelablePromise<ApiResponseBoolean> {\n        return __request(OpenAPI, {\n            method: 'DELETE',\n            url: '/bookings/{id}',\n        });\n    }\n    public static owner(id: string): CancelablePromise<UserDto> {\n        return __request(OpenAPI, {\n            method: 'GET',\n            url: '/bookings/{id}/owner',\n        });\n    }\n    public static links(): CancelablePromise<Array<Link>> {\n        return __request(OpenAPI, {\n            method: 'GET',\n            url: '/bookings/links',\n        });\n    }\n}\n",
    )?;
    write(out, "index.ts", "export { BookingsService } from './services/BookingsService';\n")
}

/// Stands in for openapi-typescript-codegen.
fn fake_generator(service: &str, spec: &Path, out: &Path) -> Result<()> {
    if !spec.is_file() {
        return Err(MergeError::Generator {
            service: service.to_string(),
            reason: format!("spec {} was not persisted", spec.display()),
        });
    }
    write_core(out)?;
    write_envelope_support(out)?;
    match service {
        "identity" => write_identity(out),
        "booking" => write_booking(out),
        other => Err(MergeError::Generator {
            service: other.to_string(),
            reason: "unknown fixture".to_string(),
        }),
    }
}

async fn identity_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v3/api-docs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(identity_doc()))
        .mount(&server)
        .await;
    server
}

fn sources(server: &MockServer, booking_spec: &Path) -> Vec<ServiceSource> {
    vec![
        ServiceSource::new(
            "identity",
            SpecSource::parse(&format!("{}/v3/api-docs", server.uri())).unwrap(),
        )
        .unwrap(),
        ServiceSource::new("booking", SpecSource::File(booking_spec.to_path_buf())).unwrap(),
    ]
}

fn read(root: &Path, rel: &str) -> String {
    fsutil::read(&root.join(rel)).unwrap()
}

#[tokio::test]
async fn test_merge_two_services() {
    let server = identity_server().await;
    let dir = tempfile::tempdir().unwrap();
    let booking_spec = dir.path().join("booking.json");
    fsutil::write(&booking_spec, &booking_doc().to_string()).unwrap();
    let out = dir.path().join("api");
    // Leftovers from an earlier run are wiped.
    fsutil::write(&out.join("stale/Old.ts"), "export {};").unwrap();

    let config = PipelineConfig::new(&out, sources(&server, &booking_spec));
    let summary = Pipeline::new(config, fake_generator).run().await.unwrap();
    assert!(!out.join("stale").exists());
    assert!(!out.join(".specs").exists());

    // Identical models land in common/ and the per-service copies are gone.
    assert!(out.join("common/models/Link.ts").is_file());
    assert!(out.join("common/schemas/$Link.ts").is_file());
    assert!(!out.join("identity/models/Link.ts").exists());
    assert!(!out.join("booking/models/Link.ts").exists());
    let assignment = read(&out, "identity/models/CompanyRoleAssignmentDto.ts");
    assert!(assignment.contains("import type { Link } from '../../common/models/Link';"));

    // Same name, different shape: one namespaced copy per service.
    let identity_user = read(&out, "identity/models/Identity_UserDto.ts");
    assert!(identity_user.contains("export type Identity_UserDto = {"));
    assert!(identity_user.contains("roles?: Array<UserRole>;"));
    let booking_user = read(&out, "booking/models/Booking_UserDto.ts");
    assert!(booking_user.contains("state?: Status;"));
    assert!(booking_user.contains("import type { Status } from '../../types';"));
    assert!(out.join("booking/schemas/$Booking_UserDto.ts").is_file());
    assert_eq!(summary.record.renamed.len(), 2);
    assert!(summary.record.renamed.iter().all(|r| r.reason == RenameReason::Collision));

    // Enums: one entry per value set, namespaces lifted.
    assert_eq!(summary.enums.len(), 3);
    assert!(!assignment.contains("namespace"));
    assert!(assignment.contains("role?: CompanyRole;"));
    assert!(assignment.contains("import type { CompanyRole } from '../../types';"));
    let status = summary.enums.get("Status").unwrap();
    assert_eq!(status.sources.len(), 2);

    // Shared types module.
    let types = read(&out, "types/index.ts");
    assert!(types.contains("export type CompanyRole = 'ADMIN' | 'EMPLOYEE';"));
    assert!(types.contains("export type Status = 'CONFIRMED' | 'PENDING';"));
    assert!(types.contains("export type UserRole = 'ADMIN' | 'USER';"));
    assert!(types.contains("export interface ApiResponse<T = unknown> {"));
    assert!(types.contains("export type ApiResponseBoolean = ApiResponse<boolean>;"));
    assert!(types.contains(
        "export type ApiResponseUserDto = ApiResponse<import('../booking/models/Booking_UserDto').Booking_UserDto>;"
    ));
    assert!(types.contains("export type { Link } from '../common/models/Link';"));
    assert!(types.contains("export type { Identity_UserDto } from '../identity/models/Identity_UserDto';"));
    assert!(!out.join("common/models/ApiResponseBoolean.ts").exists());
    assert!(!out.join("common/models/ApiMeta.ts").exists());
    assert_eq!(summary.aliases.len(), 2);

    // Runtime and service binding.
    assert_eq!(summary.runtime, out.join("common/core/http.ts"));
    let http = read(&out, "common/core/http.ts");
    assert!(http.contains("export class ApiHttpError extends Error"));
    assert!(http.contains("throw new ApiHttpError(options, result, 'Generic Error');"));
    assert!(!out.join("common/core/OpenAPI.ts").exists());
    assert!(!out.join("identity/core").exists());

    let users = read(&out, "identity/services/UsersService.ts");
    assert!(users.contains("import type { Identity_UserDto as UserDto } from '../models/Identity_UserDto';"));
    assert!(users.contains("import type { CancelablePromise } from '../../common/core/http';"));
    assert!(users.contains("import type { OpenAPIConfig } from '../OpenAPI';"));
    assert!(users.contains("import { request as __request } from '../../common/core/http';"));
    assert!(users.contains("import type { CompanyRole } from '../../types';"));
    assert!(users.contains("constructor(private readonly config: OpenAPIConfig) {}"));
    assert!(users.contains("role: CompanyRole,"));
    assert!(users.contains("return __request(this.config, {"));
    assert!(!users.contains("static"));

    let bookings = read(&out, "booking/services/BookingsService.ts");
    assert!(bookings.contains("import type { ApiResponseBoolean } from '../../types';"));
    assert!(bookings.contains("import type { Link } from '../../common/models/Link';"));
    assert!(bookings.contains("import type { Booking_UserDto as UserDto } from '../models/Booking_UserDto';"));

    // Entry points.
    let client = read(&out, "identity/client.ts");
    assert!(client.contains("export const createIdentityClient = (options: ClientOptions) => {"));
    assert!(client.contains("return { UsersService: new UsersService(config) };"));
    let shim = read(&out, "booking/OpenAPI.ts");
    assert!(shim.contains("export { createConfig, getBaseUrl, getToken } from '../common/core/http';"));
    let barrel = read(&out, "booking/index.ts");
    assert!(barrel.contains("export * from './services/BookingsService';"));
    assert!(barrel.contains("export * from '../types';"));
    assert!(barrel.contains("export { ApiHttpError, CancelablePromise, CancelError } from '../common/core/http';"));
    assert!(barrel.contains("export type { ApiRequestOptions, ApiResult, OnCancel } from '../common/core/http';"));
    assert!(!barrel.contains("./core/"));
    assert_eq!(summary.clients.len(), 6);

    // Nothing dangling, and a second rewrite pass is a no-op.
    assert!(summary.rewrite.unresolved.is_empty(), "{:?}", summary.rewrite.unresolved);
    let again = rewrite_tree(&out, &RelocationMap::new()).unwrap();
    assert_eq!(again.changed_files, 0);
    assert!(again.unresolved.is_empty());

    // Audit trail.
    let migration: Value = serde_json::from_str(&read(&out, "migration.json")).unwrap();
    assert_eq!(migration["services"], json!(["identity", "booking"]));
    assert!(migration["generatedAt"].is_string());
    assert!(migration["merged"].as_array().unwrap().contains(&json!("Link")));
    assert_eq!(migration["renamed"][0]["reason"], "collision");
    assert_eq!(migration["aliases"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_fetch_failure_aborts_the_run() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v3/api-docs"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    let dir = tempfile::tempdir().unwrap();
    let booking_spec = dir.path().join("booking.json");
    fsutil::write(&booking_spec, &booking_doc().to_string()).unwrap();

    let config = PipelineConfig::new(dir.path().join("api"), sources(&server, &booking_spec));
    let err = Pipeline::new(config, fake_generator).run().await.unwrap_err();
    assert!(matches!(err, MergeError::Fetch { .. }));
    assert!(!dir.path().join("api/migration.json").exists());
}

#[tokio::test]
async fn test_generator_failure_aborts_the_run() {
    let server = identity_server().await;
    let dir = tempfile::tempdir().unwrap();
    let booking_spec = dir.path().join("booking.json");
    fsutil::write(&booking_spec, &booking_doc().to_string()).unwrap();

    let failing = |service: &str, _spec: &Path, _out: &Path| -> Result<()> {
        Err(MergeError::Generator {
            service: service.to_string(),
            reason: "exited with 1".to_string(),
        })
    };
    let config = PipelineConfig::new(dir.path().join("api"), sources(&server, &booking_spec));
    let err = Pipeline::new(config, failing).run().await.unwrap_err();
    assert!(matches!(err, MergeError::Generator { ref service, .. } if service == "identity"));
}
