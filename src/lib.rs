pub mod shared {
    pub mod core {
        pub mod primitives;
    }
    pub mod infrastructure {
        pub mod outbox_store;
    }
}

pub mod modules {
    pub mod outbox {
        pub mod core {
            pub mod message;
            pub mod publisher;
            pub mod retry_policy;
            pub mod scope;
            pub mod state;
        }
        pub mod use_cases {
            pub mod enqueue_message {
                pub mod handler;
                pub mod outgoing_message;
                pub mod inbound {
                    pub mod http;
                }
            }
            pub mod process_outbox {
                pub mod processor;
                pub mod inbound {
                    pub mod http;
                }
            }
        }
        pub mod adapters {
            pub mod outbound {
                pub mod in_memory_scope;
                pub mod publishers;
            }
        }
    }
}

pub mod shell;
