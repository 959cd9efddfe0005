/// GQL query to recover a member's email address from their GitHub login
/// through the organization's SAML identity provider
pub const USER2EMAIL: &str = r#"query($org:String!, $user:String!) {
    organization(login: $org) {
        samlIdentityProvider {
            externalIdentities(login: $user, first:1) {
                edges {
                    node {
                        samlIdentity {
                            nameId
                        }
                    }
                }
            }
        }
    }
}"#;

/// Where the email lives in the response to [`USER2EMAIL`]
pub const USER2EMAIL_NAME_ID: &str =
    "/data/organization/samlIdentityProvider/externalIdentities/edges/0/node/samlIdentity/nameId";
