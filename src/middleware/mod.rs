/*
 * Responsibility
 * - Public surface of the middleware stack
 *   - auth: bearer authentication + rule-table authorization
 *   - http: request id, limits, timeout, tracing
 */
pub mod auth;
pub mod http;
