use itertools::Itertools;
use once_cell::sync::Lazy;

pub const TABLE: &str = "test_data";

/// Column order shared by `CREATE_TABLE`, `INSERT_STATEMENT` and `TestRow::values`
pub const COLUMNS: [&str; 66] = [
    "order_id",
    "user_id",
    "product_id",
    "product_name",
    "category_id",
    "price",
    "quantity",
    "discount",
    "tax",
    "status",
    "order_date",
    "delivery_date",
    "city",
    "state",
    "country_id",
    "email",
    "phone",
    "customer_name",
    "shipping_address",
    "billing_address",
    "rating",
    "is_returned",
    "platform",
    "device_type",
    "notes",
    "coupon_code",
    "shipping_method",
    "payment_method",
    "invoice_number",
    "gift_wrap",
    "warehouse_id",
    "batch_number",
    "supplier_id",
    "shipment_id",
    "carrier_id",
    "tracking_number",
    "browser",
    "os",
    "os_version",
    "ip_address",
    "user_agent",
    "latitude",
    "longitude",
    "timezone",
    "campaign_name",
    "referral_source",
    "session_id",
    "page_views",
    "clicks",
    "impressions",
    "is_new_customer",
    "conversion_rate",
    "avg_order_value",
    "lifetime_value",
    "loyalty_points",
    "membership_level",
    "age",
    "occupation",
    "education_level",
    "income_range",
    "marital_status",
    "preferred_language",
    "custom_field_1",
    "custom_field_2",
    "custom_field_3",
    "custom_field_4",
];

// Types are chosen so both SQLite and DuckDB accept the statement unchanged.
// Dates are unix seconds.
pub const CREATE_TABLE: &str = "create table test_data (
    order_id integer primary key,
    user_id integer not null,
    product_id integer,
    product_name varchar(255),
    category_id integer,
    price decimal(10,2) not null,
    quantity integer,
    discount float,
    tax float,
    status varchar(20) not null,
    order_date bigint,
    delivery_date bigint,
    city varchar(100) not null,
    state varchar(100),
    country_id integer,
    email varchar(255),
    phone varchar(50),
    customer_name varchar(255),
    shipping_address text,
    billing_address text,
    rating float not null,
    is_returned boolean,
    platform varchar(50),
    device_type varchar(50),
    notes text,
    coupon_code varchar(50),
    shipping_method varchar(50),
    payment_method varchar(50),
    invoice_number varchar(50),
    gift_wrap varchar(10),
    warehouse_id integer,
    batch_number integer,
    supplier_id integer,
    shipment_id integer,
    carrier_id integer,
    tracking_number varchar(50),
    browser varchar(50),
    os varchar(50),
    os_version integer,
    ip_address varchar(50),
    user_agent text,
    latitude double,
    longitude double,
    timezone varchar(100),
    campaign_name varchar(255),
    referral_source varchar(255),
    session_id varchar(50),
    page_views integer,
    clicks integer,
    impressions integer,
    is_new_customer boolean,
    conversion_rate float,
    avg_order_value float,
    lifetime_value float,
    loyalty_points integer,
    membership_level varchar(50),
    age integer,
    occupation varchar(100),
    education_level varchar(50),
    income_range varchar(50),
    marital_status varchar(50),
    preferred_language varchar(100),
    custom_field_1 varchar(100),
    custom_field_2 varchar(100),
    custom_field_3 varchar(100),
    custom_field_4 varchar(100)
)";

pub static INSERT_STATEMENT: Lazy<String> = Lazy::new(|| {
    format!(
        "insert into {TABLE} ({}) values ({})",
        COLUMNS.iter().join(", "),
        COLUMNS.iter().map(|_| "?").join(", ")
    )
});

/// Backend neutral value of a single column, adapters convert these into their own `ToSql`
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Field<'a> {
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(&'a str),
}

/// One synthetic order, a flat record without relations
#[derive(Debug, Clone, PartialEq)]
pub struct TestRow {
    pub order_id: i64,
    pub user_id: i64,
    pub product_id: i64,
    pub product_name: &'static str,
    pub category_id: i64,
    pub price: f64,
    pub quantity: i64,
    pub discount: f64,
    pub tax: f64,
    pub status: &'static str,
    pub order_date: i64,
    pub delivery_date: i64,
    pub city: &'static str,
    pub state: &'static str,
    pub country_id: i64,
    pub email: String,
    pub phone: String,
    pub customer_name: String,
    pub shipping_address: String,
    pub billing_address: String,
    pub rating: f64,
    pub is_returned: bool,
    pub platform: &'static str,
    pub device_type: &'static str,
    pub notes: String,
    pub coupon_code: String,
    pub shipping_method: &'static str,
    pub payment_method: &'static str,
    pub invoice_number: String,
    pub gift_wrap: &'static str,
    pub warehouse_id: i64,
    pub batch_number: i64,
    pub supplier_id: i64,
    pub shipment_id: i64,
    pub carrier_id: i64,
    pub tracking_number: String,
    pub browser: &'static str,
    pub os: &'static str,
    pub os_version: i64,
    pub ip_address: String,
    pub user_agent: &'static str,
    pub latitude: f64,
    pub longitude: f64,
    pub timezone: &'static str,
    pub campaign_name: &'static str,
    pub referral_source: &'static str,
    pub session_id: String,
    pub page_views: i64,
    pub clicks: i64,
    pub impressions: i64,
    pub is_new_customer: bool,
    pub conversion_rate: f64,
    pub avg_order_value: f64,
    pub lifetime_value: f64,
    pub loyalty_points: i64,
    pub membership_level: &'static str,
    pub age: i64,
    pub occupation: &'static str,
    pub education_level: &'static str,
    pub income_range: &'static str,
    pub marital_status: &'static str,
    pub preferred_language: &'static str,
    pub custom_field_1: &'static str,
    pub custom_field_2: &'static str,
    pub custom_field_3: &'static str,
    pub custom_field_4: &'static str,
}

impl TestRow {
    /// all values in `COLUMNS` order
    pub fn values(&self) -> [Field<'_>; 66] {
        use Field::*;

        [
            Int(self.order_id),
            Int(self.user_id),
            Int(self.product_id),
            Text(self.product_name),
            Int(self.category_id),
            Float(self.price),
            Int(self.quantity),
            Float(self.discount),
            Float(self.tax),
            Text(self.status),
            Int(self.order_date),
            Int(self.delivery_date),
            Text(self.city),
            Text(self.state),
            Int(self.country_id),
            Text(&self.email),
            Text(&self.phone),
            Text(&self.customer_name),
            Text(&self.shipping_address),
            Text(&self.billing_address),
            Float(self.rating),
            Bool(self.is_returned),
            Text(self.platform),
            Text(self.device_type),
            Text(&self.notes),
            Text(&self.coupon_code),
            Text(self.shipping_method),
            Text(self.payment_method),
            Text(&self.invoice_number),
            Text(self.gift_wrap),
            Int(self.warehouse_id),
            Int(self.batch_number),
            Int(self.supplier_id),
            Int(self.shipment_id),
            Int(self.carrier_id),
            Text(&self.tracking_number),
            Text(self.browser),
            Text(self.os),
            Int(self.os_version),
            Text(&self.ip_address),
            Text(self.user_agent),
            Float(self.latitude),
            Float(self.longitude),
            Text(self.timezone),
            Text(self.campaign_name),
            Text(self.referral_source),
            Text(&self.session_id),
            Int(self.page_views),
            Int(self.clicks),
            Int(self.impressions),
            Bool(self.is_new_customer),
            Float(self.conversion_rate),
            Float(self.avg_order_value),
            Float(self.lifetime_value),
            Int(self.loyalty_points),
            Text(self.membership_level),
            Int(self.age),
            Text(self.occupation),
            Text(self.education_level),
            Text(self.income_range),
            Text(self.marital_status),
            Text(self.preferred_language),
            Text(self.custom_field_1),
            Text(self.custom_field_2),
            Text(self.custom_field_3),
            Text(self.custom_field_4),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_statement_binds_every_column() {
        assert_eq!(INSERT_STATEMENT.matches('?').count(), COLUMNS.len());
        assert!(INSERT_STATEMENT.starts_with("insert into test_data (order_id, user_id,"));
    }

    #[test]
    fn create_table_defines_every_column() {
        for column in COLUMNS {
            assert!(
                CREATE_TABLE.contains(&format!("    {column} ")),
                "{column} missing from create statement"
            );
        }
    }
}
