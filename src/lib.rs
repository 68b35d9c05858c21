pub mod shared {
    pub mod config;
    pub mod core {
        pub mod envelope;
        pub mod principal;
        pub mod product;
    }
    pub mod infrastructure {
        pub mod distributed_lock;
        pub mod event_publisher;
        pub mod idempotency;
        pub mod import_jobs;
        pub mod import_source;
        pub mod product_store;
    }
}

pub mod modules {
    pub mod catalog_sync {
        pub mod core {
            pub mod availability;
            pub mod badges;
            pub mod events;
            pub mod intents;
            pub mod qa;
            pub mod reviews;
        }
        pub mod use_cases {
            pub mod denormalize;
            pub mod sync_reviews {
                pub mod handler;
                pub mod inbound {
                    pub mod http;
                }
            }
            pub mod sync_inventory {
                pub mod handler;
                pub mod inbound {
                    pub mod http;
                }
            }
            pub mod sync_analytics {
                pub mod handler;
                pub mod inbound {
                    pub mod http;
                }
            }
            pub mod sync_qa {
                pub mod handler;
                pub mod inbound {
                    pub mod http;
                }
            }
        }
        pub mod adapters {
            pub mod outbound {
                pub mod event_emitter;
            }
        }
    }
    pub mod bulk_import {
        pub mod core {
            pub mod events;
            pub mod intents;
            pub mod job;
            pub mod row;
        }
        pub mod use_cases {
            pub mod run_import {
                pub mod handler;
                pub mod lease;
                pub mod inbound {
                    pub mod http;
                }
            }
            pub mod submit_import {
                pub mod handler;
                pub mod inbound {
                    pub mod http;
                }
            }
            pub mod cancel_import {
                pub mod handler;
                pub mod inbound {
                    pub mod http;
                }
            }
            pub mod get_import_job {
                pub mod handler;
                pub mod inbound {
                    pub mod http;
                }
            }
            pub mod list_import_jobs {
                pub mod handler;
                pub mod inbound {
                    pub mod http;
                }
            }
            pub mod retry_import {
                pub mod handler;
                pub mod inbound {
                    pub mod http;
                }
            }
            pub mod delete_import {
                pub mod handler;
                pub mod inbound {
                    pub mod http;
                }
            }
        }
        pub mod adapters {
            pub mod outbound {
                pub mod event_emitter;
            }
        }
    }
}

pub mod shell;

#[cfg(test)]
pub mod tests {
    pub mod fixtures {
        pub mod events;
        pub mod import_rows;
        pub mod products;
        pub mod state;
    }

    pub mod e2e {
        pub mod bulk_import_tests;
        pub mod catalog_sync_tests;
    }
}
