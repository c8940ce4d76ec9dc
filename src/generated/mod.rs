//! Operation table and facade methods emitted by `ebay-codegen`
//!
//! Everything between an `ANCHOR ... BEGIN` and `ANCHOR ... END` pair is
//! rewritten on every run. Edit outside the anchors only.

use serde_json::Value;

use crate::auth::AuthFlow;
use crate::error::Result;
use crate::facade::EbayApi;
use crate::operations::{Host, OperationDescriptor, Pagination, ParamKind, ParamSpec, Params};
use crate::paging::Paged;

// ANCHOR packages BEGIN
// ANCHOR packages END

/// Descriptor for a facade method name
pub fn find(method_name: &str) -> Option<&'static OperationDescriptor> {
    OPERATIONS.iter().copied().find(|op| op.method_name == method_name)
}

// ANCHOR descriptors BEGIN
pub static BUY_BROWSE_GET_ITEM: OperationDescriptor = OperationDescriptor {
    method_name: "buy_browse_get_item",
    module: "item",
    api: "buy_browse",
    base_path: "/buy/browse/v1",
    operation_id: "getItem",
    http_method: "GET",
    path: "/item/{item_id}",
    host: Host::Api,
    flow: AuthFlow::ClientCredentials,
    params: &[
        ParamSpec { name: "item_id", kind: ParamKind::Path, required: true },
        ParamSpec { name: "fieldgroups", kind: ParamKind::Query, required: false },
    ],
    rate_keys: &["buy.browse", "buy.browse.item"],
    pagination: Pagination::Single,
    items_field: None,
    max_limit: None,
};

pub static BUY_BROWSE_GET_ITEMS_BY_ITEM_GROUP: OperationDescriptor = OperationDescriptor {
    method_name: "buy_browse_get_items_by_item_group",
    module: "item",
    api: "buy_browse",
    base_path: "/buy/browse/v1",
    operation_id: "getItemsByItemGroup",
    http_method: "GET",
    path: "/item/get_items_by_item_group",
    host: Host::Api,
    flow: AuthFlow::ClientCredentials,
    params: &[
        ParamSpec { name: "item_group_id", kind: ParamKind::Query, required: true },
    ],
    rate_keys: &["buy.browse", "buy.browse.item"],
    pagination: Pagination::Single,
    items_field: None,
    max_limit: None,
};

pub static BUY_BROWSE_SEARCH: OperationDescriptor = OperationDescriptor {
    method_name: "buy_browse_search",
    module: "item_summary",
    api: "buy_browse",
    base_path: "/buy/browse/v1",
    operation_id: "search",
    http_method: "GET",
    path: "/item_summary/search",
    host: Host::Api,
    flow: AuthFlow::ClientCredentials,
    params: &[
        ParamSpec { name: "q", kind: ParamKind::Query, required: false },
        ParamSpec { name: "category_ids", kind: ParamKind::Query, required: false },
        ParamSpec { name: "filter", kind: ParamKind::Query, required: false },
        ParamSpec { name: "sort", kind: ParamKind::Query, required: false },
        ParamSpec { name: "limit", kind: ParamKind::Query, required: false },
        ParamSpec { name: "offset", kind: ParamKind::Query, required: false },
        ParamSpec { name: "fieldgroups", kind: ParamKind::Query, required: false },
    ],
    rate_keys: &["buy.browse", "buy.browse.item_summary"],
    pagination: Pagination::Paged,
    items_field: Some("itemSummaries"),
    max_limit: Some(200),
};

pub static COMMERCE_TAXONOMY_GET_CATEGORY_SUGGESTIONS: OperationDescriptor = OperationDescriptor {
    method_name: "commerce_taxonomy_get_category_suggestions",
    module: "category_tree",
    api: "commerce_taxonomy",
    base_path: "/commerce/taxonomy/v1",
    operation_id: "getCategorySuggestions",
    http_method: "GET",
    path: "/category_tree/{category_tree_id}/get_category_suggestions",
    host: Host::Api,
    flow: AuthFlow::ClientCredentials,
    params: &[
        ParamSpec { name: "category_tree_id", kind: ParamKind::Path, required: true },
        ParamSpec { name: "q", kind: ParamKind::Query, required: true },
    ],
    rate_keys: &["commerce.taxonomy", "commerce.taxonomy.category_tree"],
    pagination: Pagination::Single,
    items_field: None,
    max_limit: None,
};

pub static COMMERCE_TAXONOMY_GET_DEFAULT_CATEGORY_TREE_ID: OperationDescriptor = OperationDescriptor {
    method_name: "commerce_taxonomy_get_default_category_tree_id",
    module: "category_tree",
    api: "commerce_taxonomy",
    base_path: "/commerce/taxonomy/v1",
    operation_id: "getDefaultCategoryTreeId",
    http_method: "GET",
    path: "/get_default_category_tree_id",
    host: Host::Api,
    flow: AuthFlow::ClientCredentials,
    params: &[
        ParamSpec { name: "marketplace_id", kind: ParamKind::Query, required: true },
    ],
    rate_keys: &["commerce.taxonomy", "commerce.taxonomy.category_tree"],
    pagination: Pagination::Single,
    items_field: None,
    max_limit: None,
};

pub static DEVELOPER_ANALYTICS_GET_RATE_LIMITS: OperationDescriptor = OperationDescriptor {
    method_name: "developer_analytics_get_rate_limits",
    module: "rate_limit",
    api: "developer_analytics",
    base_path: "/developer/analytics/v1_beta",
    operation_id: "getRateLimits",
    http_method: "GET",
    path: "/rate_limit/",
    host: Host::Api,
    flow: AuthFlow::ClientCredentials,
    params: &[
        ParamSpec { name: "api_context", kind: ParamKind::Query, required: false },
        ParamSpec { name: "api_name", kind: ParamKind::Query, required: false },
    ],
    rate_keys: &["developer.analytics", "developer.analytics.rate_limit"],
    pagination: Pagination::Single,
    items_field: None,
    max_limit: None,
};

pub static DEVELOPER_ANALYTICS_GET_USER_RATE_LIMITS: OperationDescriptor = OperationDescriptor {
    method_name: "developer_analytics_get_user_rate_limits",
    module: "user_rate_limit",
    api: "developer_analytics",
    base_path: "/developer/analytics/v1_beta",
    operation_id: "getUserRateLimits",
    http_method: "GET",
    path: "/user_rate_limit/",
    host: Host::Api,
    flow: AuthFlow::AuthorizationCode,
    params: &[
        ParamSpec { name: "api_context", kind: ParamKind::Query, required: false },
        ParamSpec { name: "api_name", kind: ParamKind::Query, required: false },
    ],
    rate_keys: &["developer.analytics", "developer.analytics.user_rate_limit"],
    pagination: Pagination::Single,
    items_field: None,
    max_limit: None,
};

pub static SELL_FINANCES_GET_TRANSACTIONS: OperationDescriptor = OperationDescriptor {
    method_name: "sell_finances_get_transactions",
    module: "transaction",
    api: "sell_finances",
    base_path: "/sell/finances/v1",
    operation_id: "getTransactions",
    http_method: "GET",
    path: "/transaction",
    host: Host::Apiz,
    flow: AuthFlow::AuthorizationCode,
    params: &[
        ParamSpec { name: "filter", kind: ParamKind::Query, required: false },
        ParamSpec { name: "limit", kind: ParamKind::Query, required: false },
        ParamSpec { name: "offset", kind: ParamKind::Query, required: false },
        ParamSpec { name: "sort", kind: ParamKind::Query, required: false },
    ],
    rate_keys: &["sell.finances", "sell.finances.transaction"],
    pagination: Pagination::Paged,
    items_field: Some("transactions"),
    max_limit: Some(1000),
};

pub static SELL_FULFILLMENT_GET_ORDER: OperationDescriptor = OperationDescriptor {
    method_name: "sell_fulfillment_get_order",
    module: "order",
    api: "sell_fulfillment",
    base_path: "/sell/fulfillment/v1",
    operation_id: "getOrder",
    http_method: "GET",
    path: "/order/{orderId}",
    host: Host::Api,
    flow: AuthFlow::AuthorizationCode,
    params: &[
        ParamSpec { name: "orderId", kind: ParamKind::Path, required: true },
        ParamSpec { name: "fieldGroups", kind: ParamKind::Query, required: false },
    ],
    rate_keys: &["sell.fulfillment", "sell.fulfillment.order"],
    pagination: Pagination::Single,
    items_field: None,
    max_limit: None,
};

pub static SELL_FULFILLMENT_GET_ORDERS: OperationDescriptor = OperationDescriptor {
    method_name: "sell_fulfillment_get_orders",
    module: "order",
    api: "sell_fulfillment",
    base_path: "/sell/fulfillment/v1",
    operation_id: "getOrders",
    http_method: "GET",
    path: "/order",
    host: Host::Api,
    flow: AuthFlow::AuthorizationCode,
    params: &[
        ParamSpec { name: "fieldGroups", kind: ParamKind::Query, required: false },
        ParamSpec { name: "filter", kind: ParamKind::Query, required: false },
        ParamSpec { name: "limit", kind: ParamKind::Query, required: false },
        ParamSpec { name: "offset", kind: ParamKind::Query, required: false },
        ParamSpec { name: "orderIds", kind: ParamKind::Query, required: false },
    ],
    rate_keys: &["sell.fulfillment", "sell.fulfillment.order"],
    pagination: Pagination::Paged,
    items_field: Some("orders"),
    max_limit: Some(200),
};

pub static SELL_INVENTORY_CREATE_OR_REPLACE_INVENTORY_ITEM: OperationDescriptor = OperationDescriptor {
    method_name: "sell_inventory_create_or_replace_inventory_item",
    module: "inventory_item",
    api: "sell_inventory",
    base_path: "/sell/inventory/v1",
    operation_id: "createOrReplaceInventoryItem",
    http_method: "PUT",
    path: "/inventory_item/{sku}",
    host: Host::Api,
    flow: AuthFlow::AuthorizationCode,
    params: &[
        ParamSpec { name: "sku", kind: ParamKind::Path, required: true },
        ParamSpec { name: "Content-Language", kind: ParamKind::Header, required: true },
        ParamSpec { name: "body", kind: ParamKind::Body, required: true },
    ],
    rate_keys: &["sell.inventory", "sell.inventory.inventory_item"],
    pagination: Pagination::Single,
    items_field: None,
    max_limit: None,
};

pub static SELL_INVENTORY_DELETE_INVENTORY_ITEM: OperationDescriptor = OperationDescriptor {
    method_name: "sell_inventory_delete_inventory_item",
    module: "inventory_item",
    api: "sell_inventory",
    base_path: "/sell/inventory/v1",
    operation_id: "deleteInventoryItem",
    http_method: "DELETE",
    path: "/inventory_item/{sku}",
    host: Host::Api,
    flow: AuthFlow::AuthorizationCode,
    params: &[
        ParamSpec { name: "sku", kind: ParamKind::Path, required: true },
    ],
    rate_keys: &["sell.inventory", "sell.inventory.inventory_item"],
    pagination: Pagination::Single,
    items_field: None,
    max_limit: None,
};

pub static SELL_INVENTORY_GET_INVENTORY_ITEM: OperationDescriptor = OperationDescriptor {
    method_name: "sell_inventory_get_inventory_item",
    module: "inventory_item",
    api: "sell_inventory",
    base_path: "/sell/inventory/v1",
    operation_id: "getInventoryItem",
    http_method: "GET",
    path: "/inventory_item/{sku}",
    host: Host::Api,
    flow: AuthFlow::AuthorizationCode,
    params: &[
        ParamSpec { name: "sku", kind: ParamKind::Path, required: true },
    ],
    rate_keys: &["sell.inventory", "sell.inventory.inventory_item"],
    pagination: Pagination::Single,
    items_field: None,
    max_limit: None,
};

pub static SELL_INVENTORY_GET_INVENTORY_ITEMS: OperationDescriptor = OperationDescriptor {
    method_name: "sell_inventory_get_inventory_items",
    module: "inventory_item",
    api: "sell_inventory",
    base_path: "/sell/inventory/v1",
    operation_id: "getInventoryItems",
    http_method: "GET",
    path: "/inventory_item",
    host: Host::Api,
    flow: AuthFlow::AuthorizationCode,
    params: &[
        ParamSpec { name: "limit", kind: ParamKind::Query, required: false },
        ParamSpec { name: "offset", kind: ParamKind::Query, required: false },
    ],
    rate_keys: &["sell.inventory", "sell.inventory.inventory_item"],
    pagination: Pagination::Paged,
    items_field: Some("inventoryItems"),
    max_limit: Some(200),
};

pub static OPERATIONS: &[&OperationDescriptor] = &[
    &BUY_BROWSE_GET_ITEM,
    &BUY_BROWSE_GET_ITEMS_BY_ITEM_GROUP,
    &BUY_BROWSE_SEARCH,
    &COMMERCE_TAXONOMY_GET_CATEGORY_SUGGESTIONS,
    &COMMERCE_TAXONOMY_GET_DEFAULT_CATEGORY_TREE_ID,
    &DEVELOPER_ANALYTICS_GET_RATE_LIMITS,
    &DEVELOPER_ANALYTICS_GET_USER_RATE_LIMITS,
    &SELL_FINANCES_GET_TRANSACTIONS,
    &SELL_FULFILLMENT_GET_ORDER,
    &SELL_FULFILLMENT_GET_ORDERS,
    &SELL_INVENTORY_CREATE_OR_REPLACE_INVENTORY_ITEM,
    &SELL_INVENTORY_DELETE_INVENTORY_ITEM,
    &SELL_INVENTORY_GET_INVENTORY_ITEM,
    &SELL_INVENTORY_GET_INVENTORY_ITEMS,
];
// ANCHOR descriptors END

impl EbayApi {
    // ANCHOR methods BEGIN
    /// This method retrieves the details of a specific item, such as description, price,
    /// category, all item aspects, condition, return policies, seller feedback and score,
    /// shipping options, shipping costs and estimated delivery.
    ///
    /// `GET /buy/browse/v1/item/{item_id}`
    pub async fn buy_browse_get_item(&self, item_id: &str, params: Params) -> Result<Value> {
        self.method_single(&BUY_BROWSE_GET_ITEM, params.with("item_id", item_id)).await
    }

    /// This method retrieves the details of the individual items in an item group. An item
    /// group is an item that has various aspect differences, such as color, size or storage
    /// capacity.
    ///
    /// `GET /buy/browse/v1/item/get_items_by_item_group`
    pub async fn buy_browse_get_items_by_item_group(&self, item_group_id: &str, params: Params) -> Result<Value> {
        self.method_single(&BUY_BROWSE_GET_ITEMS_BY_ITEM_GROUP, params.with("item_group_id", item_group_id)).await
    }

    /// This method searches for eBay items by various query parameters and retrieves
    /// summaries of the items. You can search by keyword, category, eBay product ID
    /// (ePID), or GTIN, or a combination of these.
    ///
    /// `GET /buy/browse/v1/item_summary/search`
    pub fn buy_browse_search(&self, params: Params) -> Result<Paged<Value>> {
        self.method_paged(&BUY_BROWSE_SEARCH, params)
    }

    /// This call returns an array of category tree leaf nodes in the specified category tree
    /// that are considered by eBay to most closely correspond to the query string q.
    ///
    /// `GET /commerce/taxonomy/v1/category_tree/{category_tree_id}/get_category_suggestions`
    pub async fn commerce_taxonomy_get_category_suggestions(&self, category_tree_id: &str, q: &str, params: Params) -> Result<Value> {
        self.method_single(&COMMERCE_TAXONOMY_GET_CATEGORY_SUGGESTIONS, params.with("category_tree_id", category_tree_id).with("q", q)).await
    }

    /// A given eBay marketplace might use multiple category trees, but one of those trees is
    /// considered to be the default for that marketplace. This call retrieves a reference to
    /// the default category tree associated with the specified eBay marketplace ID.
    ///
    /// `GET /commerce/taxonomy/v1/get_default_category_tree_id`
    pub async fn commerce_taxonomy_get_default_category_tree_id(&self, marketplace_id: &str, params: Params) -> Result<Value> {
        self.method_single(&COMMERCE_TAXONOMY_GET_DEFAULT_CATEGORY_TREE_ID, params.with("marketplace_id", marketplace_id)).await
    }

    /// This method lets you retrieve the call limit and utilization data for an application.
    ///
    /// `GET /developer/analytics/v1_beta/rate_limit/`
    pub async fn developer_analytics_get_rate_limits(&self, params: Params) -> Result<Value> {
        self.method_single(&DEVELOPER_ANALYTICS_GET_RATE_LIMITS, params).await
    }

    /// This method lets you retrieve the call limit and utilization data for an application
    /// user.
    ///
    /// `GET /developer/analytics/v1_beta/user_rate_limit/`
    pub async fn developer_analytics_get_user_rate_limits(&self, params: Params) -> Result<Value> {
        self.method_single(&DEVELOPER_ANALYTICS_GET_USER_RATE_LIMITS, params).await
    }

    /// This method allows a seller to retrieve one or more monetary transactions related to
    /// orders, payment disputes and payouts.
    ///
    /// `GET /sell/finances/v1/transaction`
    pub fn sell_finances_get_transactions(&self, params: Params) -> Result<Paged<Value>> {
        self.method_paged(&SELL_FINANCES_GET_TRANSACTIONS, params)
    }

    /// Use this call to retrieve the contents of an order based on its unique identifier,
    /// orderId.
    ///
    /// `GET /sell/fulfillment/v1/order/{orderId}`
    pub async fn sell_fulfillment_get_order(&self, order_id: &str, params: Params) -> Result<Value> {
        self.method_single(&SELL_FULFILLMENT_GET_ORDER, params.with("orderId", order_id)).await
    }

    /// Use this call to search for and retrieve one or more orders based on their creation
    /// date, last modification date, or fulfillment status using the filter parameter.
    ///
    /// `GET /sell/fulfillment/v1/order`
    pub fn sell_fulfillment_get_orders(&self, params: Params) -> Result<Paged<Value>> {
        self.method_paged(&SELL_FULFILLMENT_GET_ORDERS, params)
    }

    /// This call creates a new inventory item record or replaces an existing inventory item
    /// record.
    ///
    /// `PUT /sell/inventory/v1/inventory_item/{sku}`
    pub async fn sell_inventory_create_or_replace_inventory_item(&self, sku: &str, content_language: &str, body: Value, params: Params) -> Result<Value> {
        self.method_single(&SELL_INVENTORY_CREATE_OR_REPLACE_INVENTORY_ITEM, params.with("sku", sku).with("Content-Language", content_language).body(body)).await
    }

    /// This call is used to delete an inventory item record associated with a specified SKU.
    ///
    /// `DELETE /sell/inventory/v1/inventory_item/{sku}`
    pub async fn sell_inventory_delete_inventory_item(&self, sku: &str, params: Params) -> Result<Value> {
        self.method_single(&SELL_INVENTORY_DELETE_INVENTORY_ITEM, params.with("sku", sku)).await
    }

    /// This call retrieves the inventory item record for a given SKU.
    ///
    /// `GET /sell/inventory/v1/inventory_item/{sku}`
    pub async fn sell_inventory_get_inventory_item(&self, sku: &str, params: Params) -> Result<Value> {
        self.method_single(&SELL_INVENTORY_GET_INVENTORY_ITEM, params.with("sku", sku)).await
    }

    /// This call retrieves all inventory item records defined for the seller's account.
    ///
    /// `GET /sell/inventory/v1/inventory_item`
    pub fn sell_inventory_get_inventory_items(&self, params: Params) -> Result<Paged<Value>> {
        self.method_paged(&SELL_INVENTORY_GET_INVENTORY_ITEMS, params)
    }
    // ANCHOR methods END
}
